//! Inbound request translation.
//!
//! Both surface protocols are mapped into one [`CanonicalChatRequest`].
//! The originating protocol travels next to it as an [`InboundProtocol`]
//! tag so the response can be reshaped for the same caller.

use thiserror::Error;
use tracing::warn;

use crate::catalog::{BackendModel, ModelCatalog};
use crate::openai::{CanonicalChatRequest, ChatCompletionRequest, ChatMessage, CompletionRequest};

const CHAT_DEFAULT_TEMPERATURE: f32 = 0.7;
const CHAT_DEFAULT_MAX_TOKENS: u32 = 2048;
const FIM_DEFAULT_TEMPERATURE: f32 = 0.2;
const FIM_DEFAULT_MAX_TOKENS: u32 = 500;
const DEFAULT_TOP_P: f32 = 1.0;

/// Delimiters around the two halves of a fill-in-middle prompt.
pub const PREFIX_OPEN: &str = "<PREFIX>";
pub const PREFIX_CLOSE: &str = "</PREFIX>";
pub const SUFFIX_OPEN: &str = "<SUFFIX>";
pub const SUFFIX_CLOSE: &str = "</SUFFIX>";

const FIM_SYSTEM_PROMPT: &str = "You are a code completion engine. Return only code. \
Never use markdown, code fences, or explanations.";

/// Which wire shape originated a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundProtocol {
    /// OpenAI chat completions.
    Chat,
    /// Legacy text completions with fill-in-middle semantics.
    LegacyFim,
}

impl InboundProtocol {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::LegacyFim => "legacy_fim",
        }
    }
}

/// How unknown chat model names are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelRouting {
    /// Substitute the catalog default.
    #[default]
    Fallback,
    /// Reject the request.
    Strict,
}

/// Errors raised before any upstream work happens.
#[derive(Debug, Error)]
pub enum TranslateError {
    /// The body is not a valid request for the endpoint.
    #[error("Invalid request body: {0}")]
    InvalidRequest(#[from] serde_json::Error),

    /// Strict routing is on and the model is not in the catalog.
    #[error("Model '{0}' not found")]
    UnknownModel(String),
}

/// A canonical request plus everything needed to answer the caller.
#[derive(Debug, Clone)]
pub struct TranslatedRequest {
    pub canonical: CanonicalChatRequest,
    pub protocol: InboundProtocol,
    /// Model name echoed back in every response chunk.
    pub requested_model: String,
}

impl TranslatedRequest {
    pub const fn is_streaming(&self) -> bool {
        self.canonical.stream
    }
}

/// Parse and translate a `/v1/chat/completions` body.
pub fn translate_chat_body(
    body: &[u8],
    catalog: &ModelCatalog,
    routing: ModelRouting,
) -> Result<TranslatedRequest, TranslateError> {
    let req: ChatCompletionRequest = serde_json::from_slice(body)?;
    translate_chat(req, catalog, routing)
}

/// Translate a chat request. Messages pass through unmodified.
pub fn translate_chat(
    req: ChatCompletionRequest,
    catalog: &ModelCatalog,
    routing: ModelRouting,
) -> Result<TranslatedRequest, TranslateError> {
    let backend = match (catalog.lookup(&req.model), routing) {
        (Some(entry), _) => entry.backend,
        (None, ModelRouting::Strict) => return Err(TranslateError::UnknownModel(req.model)),
        (None, ModelRouting::Fallback) => {
            let fallback = catalog.default_entry();
            warn!(
                requested = %req.model,
                fallback = %fallback.name,
                "Unknown model, routing to default"
            );
            fallback.backend
        }
    };

    Ok(TranslatedRequest {
        canonical: CanonicalChatRequest {
            model: backend,
            messages: req.messages,
            stream: req.stream,
            temperature: req.temperature.unwrap_or(CHAT_DEFAULT_TEMPERATURE),
            max_tokens: req.max_tokens.unwrap_or(CHAT_DEFAULT_MAX_TOKENS),
            top_p: req.top_p.unwrap_or(DEFAULT_TOP_P),
            stop: req.stop,
        },
        protocol: InboundProtocol::Chat,
        requested_model: req.model,
    })
}

/// Parse and translate a legacy `/v1/completions` body.
pub fn translate_completion_body(body: &[u8]) -> Result<TranslatedRequest, TranslateError> {
    let req: CompletionRequest = serde_json::from_slice(body)?;
    Ok(translate_completion(req))
}

/// Translate a legacy completion into a chat request against the FIM model.
pub fn translate_completion(req: CompletionRequest) -> TranslatedRequest {
    let prompt = build_fim_prompt(&req.prompt, req.suffix.as_deref());

    TranslatedRequest {
        canonical: CanonicalChatRequest {
            model: BackendModel::FIM,
            messages: vec![ChatMessage::system(FIM_SYSTEM_PROMPT), ChatMessage::user(prompt)],
            stream: req.stream,
            temperature: req.temperature.unwrap_or(FIM_DEFAULT_TEMPERATURE),
            max_tokens: req.max_tokens.unwrap_or(FIM_DEFAULT_MAX_TOKENS),
            top_p: req.top_p.unwrap_or(DEFAULT_TOP_P),
            stop: req.stop,
        },
        protocol: InboundProtocol::LegacyFim,
        requested_model: req
            .model
            .unwrap_or_else(|| BackendModel::FIM.as_str().to_string()),
    }
}

/// Build the user prompt for a completion.
///
/// With a non-empty suffix the prefix and suffix are wrapped in delimiter
/// markers and the model is asked for the missing middle. Otherwise the
/// model is asked to continue the prefix.
pub fn build_fim_prompt(prefix: &str, suffix: Option<&str>) -> String {
    match suffix.filter(|s| !s.is_empty()) {
        Some(suffix) => format!(
            "Fill in the code that belongs between the prefix and the suffix.\n\n\
             {PREFIX_OPEN}{prefix}{PREFIX_CLOSE}\n\
             {SUFFIX_OPEN}{suffix}{SUFFIX_CLOSE}\n\n\
             Return ONLY the code to insert. No markdown, no explanation."
        ),
        None => format!(
            "Continue the following code.\n\n\
             {prefix}\n\n\
             Return ONLY the continuation. No markdown, no explanation."
        ),
    }
}
