//! Protocol core for fimgate.
//!
//! Pure, I/O-free building blocks: the static [`ModelCatalog`], inbound
//! request translation into a [`CanonicalChatRequest`], the per-stream
//! [`StreamTranscoder`], and buffered response aggregation. The HTTP
//! adapter lives in `fimgate-proxy`.

pub mod aggregate;
pub mod catalog;
pub mod openai;
pub mod transcode;
pub mod translate;

pub use aggregate::{aggregate, to_text_completion};
pub use catalog::{BackendModel, Capability, ModelCatalog, ModelCatalogEntry, normalize_model_name};
pub use openai::{
    CanonicalChatRequest, ChatCompletionRequest, ChatMessage, CompletionRequest, MessageContent,
    TextChoice, TextCompletion, echo_requested_model,
};
pub use transcode::{OutboundEvent, SseLine, StreamTranscoder, TranscoderState, parse_sse_line};
pub use translate::{
    InboundProtocol, ModelRouting, TranslateError, TranslatedRequest, build_fim_prompt,
    translate_chat, translate_chat_body, translate_completion, translate_completion_body,
};
