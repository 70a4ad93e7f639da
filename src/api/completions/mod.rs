//! `/chat/completions` protocol support.
//!
//! The module is split into:
//! - request builder (`request_builder`)
//! - non-streaming response parser (`response_parser`)
//! - per-response stream reconstruction (`stream`)
//! - SSE body parser (`sse_parser`)

mod request_builder;
mod response_parser;
mod sse_parser;
mod stream;

use super::generation::GenerationConfig;
use super::wire::ChatRequest;
use super::ProtocolAdapter;
use crate::types::{History, Turn};
use serde_json::Value;

pub use sse_parser::parse_sse_stream;
pub use stream::{StreamSession, StreamState};

/// Adapter for OpenAI-compatible chat-completion backends.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatCompletionsAdapter;

impl ChatCompletionsAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl ProtocolAdapter for ChatCompletionsAdapter {
    type Request = ChatRequest;
    type Stream = StreamSession;

    fn render_request(&self, history: &History, config: &GenerationConfig) -> ChatRequest {
        request_builder::build_chat_request(history.turns(), config)
    }

    fn parse_response(&self, payload: &Value) -> Turn {
        response_parser::parse_chat_response(payload)
    }

    fn begin_stream(&self) -> StreamSession {
        StreamSession::new()
    }
}
