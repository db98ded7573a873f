//! OpenAI-shaped wire types.
//!
//! Three groups live here: the inbound request bodies for both surface
//! protocols, the canonical request sent upstream, and the upstream and
//! outbound response shapes. Each protocol carries only the fields it
//! defines; anything else in an inbound body is ignored by serde.

use serde::{Deserialize, Serialize};

use crate::catalog::BackendModel;

// =============================================================================
// Messages
// =============================================================================

/// Message content: plain text or a list of typed parts (images, text).
///
/// Parts are kept as raw JSON so they reach the upstream unmodified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<serde_json::Value>),
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// A single role/content pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role: "system", "user", "assistant", or "tool".
    pub role: String,
    /// Message content.
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Text(text.into()),
        }
    }

    /// Text content, if this message is plain text.
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text(text) => Some(text),
            MessageContent::Parts(_) => None,
        }
    }
}

// =============================================================================
// Inbound Requests
// =============================================================================

/// Request to `/v1/chat/completions`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionRequest {
    /// Model name as the client knows it.
    pub model: String,
    /// Ordered conversation.
    pub messages: Vec<ChatMessage>,
    /// Whether to stream the response.
    #[serde(default)]
    pub stream: bool,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
    /// Top-p sampling parameter.
    pub top_p: Option<f32>,
    /// Stop sequence(s), forwarded as given.
    pub stop: Option<serde_json::Value>,
}

/// Request to the legacy `/v1/completions` endpoint (FIM).
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionRequest {
    /// Echoed back to the client; never used for routing.
    pub model: Option<String>,
    /// Text before the insertion point.
    pub prompt: String,
    /// Text after the insertion point.
    pub suffix: Option<String>,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Top-p sampling parameter.
    pub top_p: Option<f32>,
    /// Whether to stream the response (defaults to true).
    #[serde(default = "default_true")]
    pub stream: bool,
    /// Stop sequence(s), forwarded as given.
    pub stop: Option<serde_json::Value>,
}

const fn default_true() -> bool {
    true
}

// =============================================================================
// Canonical Upstream Request
// =============================================================================

/// The single request shape the upstream understands.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalChatRequest {
    pub model: BackendModel,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<serde_json::Value>,
}

// =============================================================================
// Upstream Responses
// =============================================================================

/// One `data:` payload of the upstream chat stream.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

/// A single streaming choice.
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub delta: ChunkDelta,
    pub finish_reason: Option<String>,
}

/// Delta content in a streaming choice.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkDelta {
    pub content: Option<String>,
}

/// Buffered upstream chat completion.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    /// Token accounting, kept verbatim.
    pub usage: Option<serde_json::Value>,
}

/// A single buffered choice.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub message: ResponseMessage,
    pub finish_reason: Option<String>,
}

/// Assistant message of a buffered choice.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseMessage {
    pub content: Option<String>,
}

/// Point a chat payload's top-level `model` at the name the client asked
/// for. Every other field is left as the upstream sent it.
pub fn echo_requested_model(payload: &mut serde_json::Value, requested_model: &str) {
    if let Some(object) = payload.as_object_mut() {
        object.insert(
            "model".to_string(),
            serde_json::Value::String(requested_model.to_string()),
        );
    }
}

// =============================================================================
// Outbound Text Completions
// =============================================================================

/// Object tag shared by text-completion bodies and chunks.
pub const TEXT_COMPLETION_OBJECT: &str = "text_completion";

/// Legacy text completion, used both as a stream chunk and as the
/// buffered response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextCompletion {
    pub id: String,
    pub object: String,
    pub created: i64,
    /// Model name the client asked for.
    pub model: String,
    pub choices: Vec<TextChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<serde_json::Value>,
}

/// A single text-completion choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextChoice {
    pub text: String,
    pub index: u32,
    /// Always `null`; the upstream does not report logprobs.
    pub logprobs: Option<serde_json::Value>,
    pub finish_reason: Option<String>,
}
