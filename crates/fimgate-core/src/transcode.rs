//! Upstream SSE → client SSE transcoding.
//!
//! The upstream always streams OpenAI chat-completion chunks. Chat clients
//! get those chunks back with only `model` replaced by the name they asked
//! for; legacy completion clients get each content delta rewritten as a
//! `text_completion` chunk.
//!
//! [`StreamTranscoder`] is a pure state machine fed one line at a time.
//! Framing the byte stream into lines and writing the output is the
//! caller's job.

use tracing::{debug, warn};

use crate::openai::{
    ChatCompletionChunk, TEXT_COMPLETION_OBJECT, TextChoice, TextCompletion, echo_requested_model,
};
use crate::translate::InboundProtocol;

/// Prefix of SSE data lines.
pub const DATA_PREFIX: &str = "data:";

/// Terminal sentinel payload.
pub const DONE_MARKER: &str = "[DONE]";

/// A classified SSE line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SseLine<'a> {
    /// `data: [DONE]`
    Done,
    /// Any other `data:` payload.
    Data(&'a str),
}

/// Classify one raw line. Returns `None` for anything that is not a data
/// line (blank separators, comments, `event:` fields).
pub fn parse_sse_line(line: &str) -> Option<SseLine<'_>> {
    let payload = line.trim().strip_prefix(DATA_PREFIX)?.trim();
    if payload == DONE_MARKER {
        Some(SseLine::Done)
    } else {
        Some(SseLine::Data(payload))
    }
}

/// One event to write to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    /// A JSON payload.
    Data(String),
    /// The terminal sentinel.
    Done,
}

impl OutboundEvent {
    /// Payload text without framing.
    pub fn payload(&self) -> &str {
        match self {
            Self::Data(json) => json,
            Self::Done => DONE_MARKER,
        }
    }

    /// Serialize as an SSE event (`data: ...` followed by a blank line).
    pub fn to_sse(&self) -> String {
        format!("{DATA_PREFIX} {}\n\n", self.payload())
    }
}

/// Transcoder lifecycle.
///
/// Receiving an event and emitting its rewritten chunks both happen inside
/// one [`StreamTranscoder::push_line`] call, so there is no observable state
/// between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscoderState {
    AwaitingLine,
    Terminal,
}

/// Per-request stream transcoder. Not reusable across requests.
#[derive(Debug)]
pub struct StreamTranscoder {
    protocol: InboundProtocol,
    requested_model: String,
    emitted_content: bool,
    state: TranscoderState,
}

impl StreamTranscoder {
    pub fn new(protocol: InboundProtocol, requested_model: impl Into<String>) -> Self {
        Self {
            protocol,
            requested_model: requested_model.into(),
            emitted_content: false,
            state: TranscoderState::AwaitingLine,
        }
    }

    pub const fn state(&self) -> TranscoderState {
        self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state == TranscoderState::Terminal
    }

    /// Feed one upstream line and collect the events it produces.
    pub fn push_line(&mut self, line: &str) -> Vec<OutboundEvent> {
        if self.is_terminal() {
            return Vec::new();
        }

        match parse_sse_line(line) {
            None => Vec::new(),
            Some(SseLine::Done) => {
                self.state = TranscoderState::Terminal;
                vec![OutboundEvent::Done]
            }
            Some(SseLine::Data(payload)) => match self.protocol {
                InboundProtocol::Chat => self.passthrough(payload),
                InboundProtocol::LegacyFim => self.rewrite_as_completion(payload),
            },
        }
    }

    /// Mark the stream finished because the upstream closed.
    pub fn finish(&mut self) {
        if !self.is_terminal() {
            debug!("Upstream closed without terminal marker");
            self.state = TranscoderState::Terminal;
        }
    }

    fn passthrough(&self, payload: &str) -> Vec<OutboundEvent> {
        let mut chunk: serde_json::Value = match serde_json::from_str(payload) {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!("Skipping malformed upstream event: {e}");
                return Vec::new();
            }
        };
        echo_requested_model(&mut chunk, &self.requested_model);
        vec![OutboundEvent::Data(chunk.to_string())]
    }

    fn rewrite_as_completion(&mut self, payload: &str) -> Vec<OutboundEvent> {
        let chunk: ChatCompletionChunk = match serde_json::from_str(payload) {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!("Skipping malformed upstream event: {e}");
                return Vec::new();
            }
        };

        let mut out = Vec::with_capacity(chunk.choices.len());
        for choice in chunk.choices {
            let fragment = choice.delta.content.unwrap_or_default();
            let text = if self.emitted_content {
                fragment
            } else {
                fragment.trim_start().to_string()
            };
            if text.is_empty() {
                continue;
            }
            self.emitted_content = true;

            let completion = TextCompletion {
                id: chunk.id.clone(),
                object: TEXT_COMPLETION_OBJECT.to_string(),
                created: chunk.created,
                model: self.requested_model.clone(),
                choices: vec![TextChoice {
                    text,
                    index: choice.index,
                    logprobs: None,
                    finish_reason: choice.finish_reason,
                }],
                usage: None,
            };
            match serde_json::to_string(&completion) {
                Ok(json) => out.push(OutboundEvent::Data(json)),
                Err(e) => warn!("Failed to serialize completion chunk: {e}"),
            }
        }
        out
    }
}
