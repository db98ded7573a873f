//! OpenAI-compatible routes.
//!
//! Both completion endpoints translate into one canonical upstream
//! request and reshape the answer for the protocol they came in on.

use axum::{
    Json,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use fimgate_core::{
    StreamTranscoder, TranslatedRequest, aggregate, translate_chat_body, translate_completion_body,
};
use tracing::{debug, info};

use crate::error::ProxyError;
use crate::models::ModelsResponse;
use crate::server::ProxyState;
use crate::stream::sse_response;
use crate::upstream::UpstreamReply;

/// Health check endpoint.
pub(crate) async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok"
    }))
}

/// List catalog models in OpenAI format.
pub(crate) async fn list_models(State(state): State<ProxyState>) -> impl IntoResponse {
    debug!("GET /v1/models");
    Json(ModelsResponse::from_entries(state.catalog.entries()))
}

/// `POST /v1/chat/completions`
pub(crate) async fn chat_completions(
    State(state): State<ProxyState>,
    body: Bytes,
) -> Result<Response, ProxyError> {
    let translated = translate_chat_body(&body, state.catalog, state.routing)?;
    dispatch(&state, translated).await
}

/// `POST /v1/completions` (legacy FIM)
pub(crate) async fn completions(
    State(state): State<ProxyState>,
    body: Bytes,
) -> Result<Response, ProxyError> {
    let translated = translate_completion_body(&body)?;
    dispatch(&state, translated).await
}

/// Execute upstream and reshape the reply for the originating protocol.
async fn dispatch(state: &ProxyState, request: TranslatedRequest) -> Result<Response, ProxyError> {
    let TranslatedRequest {
        canonical,
        protocol,
        requested_model,
    } = request;

    info!(
        model = %requested_model,
        backend = %canonical.model,
        streaming = %canonical.stream,
        protocol = protocol.as_str(),
        "Processing completion request"
    );

    match state.upstream.execute(&canonical).await? {
        UpstreamReply::Stream(response) => {
            let transcoder = StreamTranscoder::new(protocol, requested_model);
            Ok(sse_response(response, transcoder, state.shutdown.child_token()))
        }
        UpstreamReply::Body(body) => {
            let out = aggregate(protocol, &body, &requested_model)
                .map_err(|e| ProxyError::UpstreamBody(e.to_string()))?;
            Ok(([(header::CONTENT_TYPE, "application/json")], out).into_response())
        }
    }
}
