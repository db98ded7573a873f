//! Buffered (non-streaming) response reshaping.

use crate::openai::{
    ChatCompletionResponse, TEXT_COMPLETION_OBJECT, TextChoice, TextCompletion, echo_requested_model,
};
use crate::translate::InboundProtocol;

/// Reshape a complete upstream body for the originating protocol.
///
/// Chat bodies keep every field except `model`, which is set to the name
/// the client asked for; legacy completion bodies are rewritten as a
/// `text_completion` object.
pub fn aggregate(
    protocol: InboundProtocol,
    body: &[u8],
    requested_model: &str,
) -> Result<Vec<u8>, serde_json::Error> {
    match protocol {
        InboundProtocol::Chat => {
            let mut upstream: serde_json::Value = serde_json::from_slice(body)?;
            echo_requested_model(&mut upstream, requested_model);
            serde_json::to_vec(&upstream)
        }
        InboundProtocol::LegacyFim => {
            let upstream: ChatCompletionResponse = serde_json::from_slice(body)?;
            serde_json::to_vec(&to_text_completion(upstream, requested_model))
        }
    }
}

/// Move each `message.content` into `text`, keeping index and finish reason.
pub fn to_text_completion(upstream: ChatCompletionResponse, requested_model: &str) -> TextCompletion {
    TextCompletion {
        id: upstream.id,
        object: TEXT_COMPLETION_OBJECT.to_string(),
        created: upstream.created,
        model: requested_model.to_string(),
        choices: upstream
            .choices
            .into_iter()
            .map(|choice| TextChoice {
                text: choice.message.content.unwrap_or_default(),
                index: choice.index,
                logprobs: None,
                finish_reason: choice.finish_reason,
            })
            .collect(),
        usage: upstream.usage,
    }
}
