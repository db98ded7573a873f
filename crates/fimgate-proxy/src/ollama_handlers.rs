//! Ollama-native discovery routes.
//!
//! Code-completion tooling probes these before it sends any completion
//! traffic. They answer from the static catalog and never touch the
//! upstream.

use axum::{
    Json,
    extract::State,
    response::IntoResponse,
};
use tracing::debug;

use crate::models::{
    OLLAMA_COMPAT_VERSION, OLLAMA_ROOT_RESPONSE, OllamaShowRequest, OllamaShowResponse,
    OllamaTagsResponse, OllamaVersionResponse,
};
use crate::server::ProxyState;

// ── GET / ──────────────────────────────────────────────────────────────

/// Ollama root probe. Returns `"Ollama is running"` (plain text).
pub(crate) async fn ollama_root() -> impl IntoResponse {
    OLLAMA_ROOT_RESPONSE
}

// ── GET /api/version ───────────────────────────────────────────────────

pub(crate) async fn ollama_version() -> impl IntoResponse {
    Json(OllamaVersionResponse {
        version: OLLAMA_COMPAT_VERSION.to_string(),
    })
}

// ── GET /api/tags ──────────────────────────────────────────────────────

pub(crate) async fn ollama_tags(State(state): State<ProxyState>) -> impl IntoResponse {
    debug!("GET /api/tags");
    Json(OllamaTagsResponse::from_entries(state.catalog.entries()))
}

// ── POST /api/show ─────────────────────────────────────────────────────

/// Describe one model. Unknown names describe the default model.
pub(crate) async fn ollama_show(
    State(state): State<ProxyState>,
    Json(req): Json<OllamaShowRequest>,
) -> impl IntoResponse {
    let requested = req.effective_model();
    let entry = state.catalog.resolve(requested);
    debug!(requested = %requested, resolved = %entry.name, "POST /api/show");
    Json(OllamaShowResponse::from_entry(entry))
}
