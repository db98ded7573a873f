//! Client for the single upstream chat-completions backend.

use bytes::Bytes;
use fimgate_core::CanonicalChatRequest;
use reqwest::{Client, header};
use tracing::{debug, error};

use crate::config::ProxyConfig;
use crate::error::ProxyError;

/// Result of an upstream call, chosen by the request's `stream` flag.
#[derive(Debug)]
pub enum UpstreamReply {
    /// Complete JSON body of a buffered call.
    Body(Bytes),
    /// Open response whose body is an SSE stream.
    Stream(reqwest::Response),
}

/// Issues canonical requests against the configured backend.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
    config: ProxyConfig,
}

impl UpstreamClient {
    /// Build a client with connect and read bounds from `config`.
    pub fn new(config: ProxyConfig) -> Result<Self, ProxyError> {
        let client = Client::builder()
            .pool_max_idle_per_host(10)
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    /// Send `request` upstream.
    ///
    /// The status is checked before any body bytes are read, so a
    /// non-success answer never reaches the client as a partial stream.
    pub async fn execute(&self, request: &CanonicalChatRequest) -> Result<UpstreamReply, ProxyError> {
        let url = &self.config.upstream_url;
        debug!(upstream = %url, model = %request.model, stream = request.stream, "Forwarding");

        let mut builder = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .header(header::CONTENT_TYPE, "application/json")
            .json(request);
        if request.stream {
            builder = builder.header(header::ACCEPT, "text/event-stream");
        } else {
            builder = builder.timeout(self.config.request_timeout);
        }

        let response = builder.send().await.map_err(|e| {
            error!("Failed to connect to upstream: {e}");
            ProxyError::Transport(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            let body = String::from_utf8_lossy(&body).into_owned();
            error!("Upstream error {status}: {body}");
            return Err(ProxyError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        if request.stream {
            Ok(UpstreamReply::Stream(response))
        } else {
            let body = response.bytes().await.map_err(|e| {
                error!("Failed to read upstream response: {e}");
                ProxyError::Transport(e)
            })?;
            Ok(UpstreamReply::Body(body))
        }
    }
}
