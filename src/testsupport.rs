//! Shared test fixtures for accounting, compaction and checkpoint tests.
//!
//! Compaction tests need turns with exact, predictable costs, so most of them
//! price text with [`WordTokenizer`] instead of the real BPE tables.

use crate::error::TokenizerError;
use crate::tokens::{TokenAccountant, Tokenizer};
use crate::types::{Part, Role, Turn};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static TEST_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

/// One token per whitespace-separated word.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordTokenizer;

impl Tokenizer for WordTokenizer {
    fn count_tokens(&self, text: &str) -> Result<usize, TokenizerError> {
        Ok(text.split_whitespace().count())
    }
}

pub fn word_accountant() -> TokenAccountant {
    TokenAccountant::new(WordTokenizer)
}

/// A single-text turn whose word-tokenizer cost is exactly `tokens`
/// (one for the role label, the rest for the text).
pub fn sized_turn(role: Role, tokens: usize) -> Turn {
    let words = vec!["w"; tokens.saturating_sub(1)].join(" ");
    Turn::new(role, vec![Part::text(words)])
}

pub fn object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

/// Model turn issuing one tool call.
pub fn call_turn(id: &str, name: &str) -> Turn {
    Turn::new(
        Role::Model,
        vec![Part::function_call(id, name, object(json!({"path": "/tmp"})))],
    )
}

/// Tool turn answering one tool call.
pub fn response_turn(id: &str, name: &str) -> Turn {
    Turn::new(
        Role::Tool,
        vec![Part::function_response(id, name, object(json!({"output": "ok"})))],
    )
}

/// Temporary directory fixture with best-effort cleanup.
#[derive(Debug)]
pub struct TestTempDir {
    path: PathBuf,
}

impl TestTempDir {
    /// Create a unique temporary directory with a readable prefix.
    pub fn new(prefix: &str) -> Self {
        let suffix = TEST_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let dir = std::env::temp_dir().join(format!("parley-{prefix}-{millis}-{suffix}"));
        fs::create_dir_all(&dir).expect("failed to create temporary fixture directory");
        Self { path: dir }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write UTF-8 text to a child path, creating parent directories as needed.
    pub fn write_text(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.path.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent directories for fixture");
        }
        fs::write(&path, content).expect("failed to write fixture file");
        path
    }
}

impl Drop for TestTempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// Build one SSE `data:` block.
pub fn sse_data_block(data: &str) -> String {
    format!("data: {data}\n\n")
}

/// SSE stream terminator block used by OpenAI-compatible streams.
pub fn sse_done_block() -> &'static str {
    "data: [DONE]\n\n"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sized_turn_costs_exactly_the_requested_amount() {
        let accountant = word_accountant();
        assert_eq!(accountant.cost_of_turn(&sized_turn(Role::User, 1000)), 1000);
        assert_eq!(accountant.cost_of_turn(&sized_turn(Role::Model, 1)), 1);
    }

    #[test]
    fn temp_dir_fixture_writes_and_resolves_paths() {
        let fixture = TestTempDir::new("fixture");
        let file = fixture.write_text("nested/file.txt", "hello");
        assert_eq!(fs::read_to_string(file).unwrap(), "hello");
        assert!(fixture.path().exists());
    }

    #[test]
    fn sse_helpers_emit_expected_wire_format() {
        assert_eq!(sse_data_block("{}"), "data: {}\n\n");
        assert_eq!(sse_done_block(), "data: [DONE]\n\n");
    }
}
