//! Canonical history <-> provider wire translation.
//!
//! The API layer is split into cohesive modules:
//! - `wire`: chat-completions payload types
//! - `schema`: tool/response schema conversion
//! - `generation`: per-request generation settings
//! - `completions`: the `/chat/completions` adapter
//!
//! Transport is out of scope; callers send the rendered request themselves
//! and hand the payload (or SSE body) back for parsing.

pub mod completions;
pub mod generation;
pub mod schema;
pub mod wire;

pub use completions::{parse_sse_stream, ChatCompletionsAdapter, StreamSession, StreamState};
pub use generation::{supports_reasoning_effort, GenerationConfig, ReasoningEffort, ToolMode};
pub use schema::{FunctionDeclaration, ScalarKind, Schema};

use crate::types::{History, Turn};
use serde::Serialize;
use serde_json::Value;

/// Translation between canonical turns and one backend's wire format.
///
/// Implementations are stateless; per-response streaming state lives in the
/// value returned by [`ProtocolAdapter::begin_stream`].
pub trait ProtocolAdapter {
    type Request: Serialize;
    type Stream;

    fn render_request(&self, history: &History, config: &GenerationConfig) -> Self::Request;

    /// Whole (non-streamed) response payload to a model turn.
    fn parse_response(&self, payload: &Value) -> Turn;

    fn begin_stream(&self) -> Self::Stream;
}
