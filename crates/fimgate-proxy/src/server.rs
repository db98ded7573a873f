//! Axum HTTP server for the proxy.
//!
//! This module provides the `serve()` function that runs the proxy server
//! on a pre-bound `TcpListener`, and `create_router()` for tests.

use axum::{
    Router,
    routing::{get, post},
};
use fimgate_core::{ModelCatalog, ModelRouting};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::ollama_handlers::{ollama_root, ollama_show, ollama_tags, ollama_version};
use crate::openai_handlers::{chat_completions, completions, health_check, list_models};
use crate::upstream::UpstreamClient;

/// Shared proxy state, injected via Axum `State`.
///
/// Used by both the OpenAI (`/v1/`) and Ollama (`/api/`) route trees.
#[derive(Debug, Clone)]
pub(crate) struct ProxyState {
    pub upstream: UpstreamClient,
    pub catalog: &'static ModelCatalog,
    pub routing: ModelRouting,
    /// Parent of every per-stream cancellation token.
    pub shutdown: CancellationToken,
}

/// Build the proxy router.
///
/// Streams opened through this router are cancelled when `shutdown` fires.
pub fn create_router(config: ProxyConfig, shutdown: CancellationToken) -> Result<Router, ProxyError> {
    let state = ProxyState {
        routing: config.routing(),
        upstream: UpstreamClient::new(config)?,
        catalog: ModelCatalog::global(),
        shutdown,
    };

    Ok(Router::new()
        // Ollama
        .route("/", get(ollama_root))
        .route("/api/version", get(ollama_version))
        .route("/api/tags", get(ollama_tags))
        .route("/api/show", post(ollama_show))
        // OpenAI
        .route("/health", get(health_check))
        .route("/v1/models", get(list_models))
        .route("/v1/chat/completions", post(chat_completions))
        .route("/v1/completions", post(completions))
        .with_state(state))
}

/// Start the proxy server with a pre-bound listener.
///
/// Runs until the cancellation token is triggered, then shuts down
/// gracefully. In-flight streams are cancelled through the same token.
pub async fn serve(
    listener: TcpListener,
    config: ProxyConfig,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    info!(upstream = %config.upstream_url(), "Proxy server starting on {addr}");

    let app = create_router(config, cancel.clone())?;

    info!("Proxy listening on {addr}");
    info!("Point Ollama clients at http://{addr} and OpenAI clients at http://{addr}/v1");

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;

    info!("Proxy server shut down");
    Ok(())
}
