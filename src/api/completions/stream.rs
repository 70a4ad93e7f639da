//! Streamed `/chat/completions` reconstruction.
//!
//! A [`StreamSession`] belongs to exactly one response. Text deltas surface
//! as soon as they arrive; tool-call fragments are buffered per index until
//! a chunk carries a `finish_reason`, at which point every pending call is
//! finalized in index order.

use super::response_parser::parse_arguments;
use crate::api::wire::{ChatChunk, ToolCallDelta};
use crate::types::{Part, Role, Turn};
use std::collections::BTreeMap;

/// Accumulator lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StreamState {
    #[default]
    Idle,
    /// Tool-call fragments are buffered.
    Accumulating,
    /// Buffered calls were just emitted; the next chunk returns to `Idle`.
    Finalized,
}

#[derive(Debug, Default)]
struct PartialToolCall {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
}

/// Per-response stream state.
#[derive(Debug, Default)]
pub struct StreamSession {
    state: StreamState,
    partials: BTreeMap<usize, PartialToolCall>,
    emitted: Vec<Part>,
}

impl StreamSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Parts surfaced so far.
    pub fn emitted(&self) -> &[Part] {
        &self.emitted
    }

    /// Apply one chunk and return the parts it surfaced.
    pub fn apply_chunk(&mut self, chunk: &ChatChunk) -> Vec<Part> {
        if self.state == StreamState::Finalized {
            self.state = StreamState::Idle;
        }
        let mut surfaced = Vec::new();
        // Only the first choice is reconstructed.
        let Some(choice) = chunk.choices.iter().find(|choice| choice.index == 0) else {
            return surfaced;
        };

        if let Some(text) = choice.delta.content.as_deref().filter(|t| !t.is_empty()) {
            surfaced.push(Part::text(text));
        }
        for delta in choice.delta.tool_calls.iter().flatten() {
            self.absorb(delta);
        }
        if choice.finish_reason.is_some() && !self.partials.is_empty() {
            surfaced.extend(self.finalize());
        }

        self.emitted.extend(surfaced.iter().cloned());
        surfaced
    }

    /// Decode and apply one SSE `data:` payload. Undecodable payloads are
    /// skipped with a warning.
    pub fn apply_data(&mut self, data: &str) -> Vec<Part> {
        match serde_json::from_str::<ChatChunk>(data) {
            Ok(chunk) => self.apply_chunk(&chunk),
            Err(err) => {
                tracing::warn!(error = %err, "skipping undecodable stream chunk");
                Vec::new()
            }
        }
    }

    /// Drop all partial and emitted state.
    pub fn cancel(&mut self) {
        if !self.partials.is_empty() {
            tracing::debug!(pending = self.partials.len(), "stream cancelled with pending tool calls");
        }
        self.partials.clear();
        self.emitted.clear();
        self.state = StreamState::Idle;
    }

    /// Fold everything surfaced into one model turn.
    ///
    /// Calls still buffered (no `finish_reason` seen) are discarded.
    /// Adjacent text fragments are joined.
    pub fn finish(mut self) -> Turn {
        if !self.partials.is_empty() {
            tracing::warn!(
                pending = self.partials.len(),
                "stream ended before tool calls were finalized; discarding them"
            );
        }
        let mut parts: Vec<Part> = Vec::with_capacity(self.emitted.len());
        for part in std::mem::take(&mut self.emitted) {
            if let (Some(Part::Text { text: prev }), Part::Text { text }) = (parts.last_mut(), &part)
            {
                prev.push_str(text);
                continue;
            }
            parts.push(part);
        }
        if parts.is_empty() {
            parts.push(Part::text(""));
        }
        Turn::new(Role::Model, parts)
    }

    fn absorb(&mut self, delta: &ToolCallDelta) {
        let partial = self.partials.entry(delta.index).or_default();
        if partial.id.is_none() {
            partial.id = delta.id.clone().filter(|id| !id.is_empty());
        }
        if let Some(function) = &delta.function {
            if partial.name.is_none() {
                partial.name = function.name.clone().filter(|name| !name.is_empty());
            }
            if let Some(arguments) = &function.arguments {
                partial.arguments.push_str(arguments);
            }
        }
        self.state = StreamState::Accumulating;
    }

    fn finalize(&mut self) -> Vec<Part> {
        let parts = std::mem::take(&mut self.partials)
            .into_iter()
            .map(|(index, partial)| {
                let id = partial.id.unwrap_or_else(|| format!("call_{index}"));
                let name = partial.name.unwrap_or_default();
                Part::function_call(id, name, parse_arguments(&partial.arguments))
            })
            .collect::<Vec<_>>();
        tracing::debug!(calls = parts.len(), "finalized streamed tool calls");
        self.state = StreamState::Finalized;
        parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ChatCompletionsAdapter, ProtocolAdapter};
    use serde_json::json;

    fn chunk(value: serde_json::Value) -> ChatChunk {
        serde_json::from_value(value).unwrap()
    }

    fn text_chunk(text: &str) -> ChatChunk {
        chunk(json!({"choices": [{"index": 0, "delta": {"content": text}}]}))
    }

    fn call_chunk(index: usize, id: Option<&str>, name: Option<&str>, args: &str) -> ChatChunk {
        chunk(json!({"choices": [{"index": 0, "delta": {"tool_calls": [{
            "index": index,
            "id": id,
            "function": {"name": name, "arguments": args}
        }]}}]}))
    }

    fn finish_chunk(reason: &str) -> ChatChunk {
        chunk(json!({"choices": [{"index": 0, "delta": {}, "finish_reason": reason}]}))
    }

    #[test]
    fn text_surfaces_immediately() {
        let mut session = StreamSession::new();
        assert_eq!(session.apply_chunk(&text_chunk("Hel")), vec![Part::text("Hel")]);
        assert_eq!(session.apply_chunk(&text_chunk("lo")), vec![Part::text("lo")]);
        assert_eq!(session.state(), StreamState::Idle);
        assert_eq!(session.finish().parts, vec![Part::text("Hello")]);
    }

    #[test]
    fn interleaved_tool_call_fragments_finalize_in_index_order() {
        let mut session = StreamSession::new();
        assert!(session
            .apply_chunk(&call_chunk(1, Some("call_b"), Some("cat"), "{\"file\":"))
            .is_empty());
        assert_eq!(session.state(), StreamState::Accumulating);
        session.apply_chunk(&call_chunk(0, Some("call_a"), Some("ls"), "{\"path\""));
        session.apply_chunk(&call_chunk(1, None, None, "\"x.txt\"}"));
        session.apply_chunk(&call_chunk(0, Some("ignored"), Some("ignored"), ":\"/\"}"));

        let parts = session.apply_chunk(&finish_chunk("tool_calls"));
        assert_eq!(session.state(), StreamState::Finalized);
        assert_eq!(parts.len(), 2);
        let a = parts[0].as_function_call().unwrap();
        assert_eq!((a.id.as_str(), a.name.as_str()), ("call_a", "ls"));
        assert_eq!(a.args["path"], "/");
        let b = parts[1].as_function_call().unwrap();
        assert_eq!(b.id, "call_b");
        assert_eq!(b.args["file"], "x.txt");

        session.apply_chunk(&ChatChunk::default());
        assert_eq!(session.state(), StreamState::Idle);
    }

    #[test]
    fn arguments_split_across_three_chunks_yield_one_call() {
        let adapter = ChatCompletionsAdapter::new();
        let mut session = adapter.begin_stream();
        session.apply_chunk(&call_chunk(0, Some("call_x"), Some("grep"), "{\"pat"));
        session.apply_chunk(&call_chunk(0, None, None, "tern\":\"fo"));
        session.apply_chunk(&call_chunk(0, None, None, "o\"}"));

        let parts = session.apply_chunk(&finish_chunk("tool_calls"));
        assert_eq!(parts.len(), 1);
        let call = parts[0].as_function_call().unwrap();
        assert_eq!((call.id.as_str(), call.name.as_str()), ("call_x", "grep"));
        assert_eq!(call.args["pattern"], "foo");
        assert_eq!(session.finish().function_calls().count(), 1);

        let next = adapter.begin_stream();
        assert_eq!(next.state(), StreamState::Idle);
        assert!(next.emitted().is_empty());
        assert_eq!(next.finish().parts, vec![Part::text("")]);
    }

    #[test]
    fn missing_id_is_synthesized_from_index() {
        let mut session = StreamSession::new();
        session.apply_chunk(&call_chunk(3, None, Some("now"), ""));
        let parts = session.apply_chunk(&finish_chunk("stop"));
        let call = parts[0].as_function_call().unwrap();
        assert_eq!(call.id, "call_3");
        assert!(call.args.is_empty());
    }

    #[test]
    fn finish_reason_without_partials_changes_nothing() {
        let mut session = StreamSession::new();
        session.apply_chunk(&text_chunk("done"));
        assert!(session.apply_chunk(&finish_chunk("stop")).is_empty());
        assert_eq!(session.state(), StreamState::Idle);
    }

    #[test]
    fn cancel_discards_partial_state() {
        let mut session = StreamSession::new();
        session.apply_chunk(&text_chunk("partial"));
        session.apply_chunk(&call_chunk(0, Some("c"), Some("ls"), "{"));
        session.cancel();
        assert_eq!(session.state(), StreamState::Idle);
        assert!(session.emitted().is_empty());
        assert!(session.apply_chunk(&finish_chunk("stop")).is_empty());
        assert_eq!(session.finish().parts, vec![Part::text("")]);
    }

    #[test]
    fn finish_drops_unfinalized_calls_but_keeps_text() {
        let mut session = StreamSession::new();
        session.apply_chunk(&text_chunk("thinking"));
        session.apply_chunk(&call_chunk(0, Some("c"), Some("ls"), "{}"));
        let turn = session.finish();
        assert_eq!(turn.parts, vec![Part::text("thinking")]);
    }

    #[test]
    fn apply_data_skips_garbage() {
        let mut session = StreamSession::new();
        assert!(session.apply_data("{not json").is_empty());
        assert_eq!(
            session.apply_data(r#"{"choices":[{"index":0,"delta":{"content":"ok"}}]}"#),
            vec![Part::text("ok")]
        );
    }
}
