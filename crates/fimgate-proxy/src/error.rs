//! Proxy error types and their HTTP mapping.
//!
//! Every failure is reported to the client once as an OpenAI-shaped error
//! body. Nothing here retries.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use fimgate_core::TranslateError;
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by the proxy handlers.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The inbound body could not be parsed or validated.
    #[error("Invalid request body: {0}")]
    InvalidRequest(String),

    /// Strict routing rejected an unknown model name.
    #[error("Model '{0}' not found")]
    ModelNotFound(String),

    /// The upstream answered with a non-success status.
    #[error("Upstream returned {status}: {body}")]
    UpstreamStatus {
        /// HTTP status code from the upstream
        status: u16,
        /// Raw response body
        body: String,
    },

    /// Connection, timeout, or other transport failure.
    #[error("Failed to reach upstream: {0}")]
    Transport(#[from] reqwest::Error),

    /// The upstream body could not be interpreted.
    #[error("Invalid upstream response: {0}")]
    UpstreamBody(String),
}

impl From<TranslateError> for ProxyError {
    fn from(err: TranslateError) -> Self {
        match err {
            TranslateError::InvalidRequest(e) => Self::InvalidRequest(e.to_string()),
            TranslateError::UnknownModel(name) => Self::ModelNotFound(name),
        }
    }
}

impl ProxyError {
    /// HTTP status reported to the client.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::ModelNotFound(_) => StatusCode::NOT_FOUND,
            Self::UpstreamStatus { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::Transport(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            Self::Transport(_) | Self::UpstreamBody(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// OpenAI error `type` and `code` for this failure.
    const fn kind(&self) -> (&'static str, &'static str) {
        match self {
            Self::InvalidRequest(_) => ("invalid_request_error", "invalid_body"),
            Self::ModelNotFound(_) => ("invalid_request_error", "model_not_found"),
            Self::UpstreamStatus { .. } | Self::Transport(_) | Self::UpstreamBody(_) => {
                ("server_error", "upstream_error")
            }
        }
    }

    fn to_error_response(&self) -> ErrorResponse {
        let (r#type, code) = self.kind();
        ErrorResponse {
            error: ErrorDetail {
                message: self.to_string(),
                r#type,
                code,
            },
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_error_response())).into_response()
    }
}

/// Error body in OpenAI format.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    pub message: String,
    pub r#type: &'static str,
    pub code: &'static str,
}
