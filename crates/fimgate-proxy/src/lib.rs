//! Ollama- and OpenAI-compatible proxy in front of a single upstream
//! chat-completions backend.
//!
//! Inbound requests are translated with `fimgate-core`, forwarded by
//! [`upstream::UpstreamClient`], and streamed back through
//! [`stream::transcode_stream`] in the shape the caller expects.

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod models;
pub mod ollama_handlers;
pub mod openai_handlers;
pub mod server;
pub mod stream;
pub mod upstream;

pub use config::{ConfigError, ProxyConfig};
pub use error::ProxyError;
pub use server::{create_router, serve};
