//! Token accounting for conversation history.
//!
//! Costs are pure functions of the current content and are never cached, so
//! any mutation of a history is reflected the next time it is measured. Text
//! is counted with the `cl100k_base` byte-pair encoding; when those tables
//! cannot be loaded the accountant falls back to a ~4 chars/token estimate.

use crate::error::TokenizerError;
use crate::types::{History, Part, Turn};
use std::fmt;
use std::sync::{Arc, OnceLock};
use tiktoken_rs::CoreBPE;

/// Flat price of one `inlineData` part, whatever its payload size.
pub const INLINE_DATA_TOKENS: usize = 258;

/// Counts tokens for a piece of text.
pub trait Tokenizer: Send + Sync {
    fn count_tokens(&self, text: &str) -> Result<usize, TokenizerError>;
}

// ---------------------------------------------------------------------------
// Tokenizers
// ---------------------------------------------------------------------------

/// Parsed once per process; `None` when the BPE tables failed to load.
static CL100K: OnceLock<Option<CoreBPE>> = OnceLock::new();

fn cl100k() -> Option<&'static CoreBPE> {
    CL100K
        .get_or_init(|| match tiktoken_rs::cl100k_base() {
            Ok(bpe) => Some(bpe),
            Err(err) => {
                tracing::warn!(error = %err, "failed to load cl100k_base tokenizer");
                None
            }
        })
        .as_ref()
}

/// Byte-pair tokenizer backed by `tiktoken-rs`.
#[derive(Clone, Copy)]
pub struct BpeTokenizer {
    bpe: &'static CoreBPE,
}

impl BpeTokenizer {
    pub fn cl100k() -> Result<Self, TokenizerError> {
        cl100k()
            .map(|bpe| Self { bpe })
            .ok_or_else(|| TokenizerError::Unavailable("cl100k_base".to_string()))
    }
}

impl Tokenizer for BpeTokenizer {
    fn count_tokens(&self, text: &str) -> Result<usize, TokenizerError> {
        Ok(self.bpe.encode_ordinary(text).len())
    }
}

impl fmt::Debug for BpeTokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BpeTokenizer(cl100k_base)")
    }
}

/// Crude heuristic: ~1 token per 4 characters, rounded up.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharEstimateTokenizer;

impl Tokenizer for CharEstimateTokenizer {
    fn count_tokens(&self, text: &str) -> Result<usize, TokenizerError> {
        Ok(text.chars().count().div_ceil(4))
    }
}

// ---------------------------------------------------------------------------
// Accountant
// ---------------------------------------------------------------------------

/// Prices parts, turns and whole histories.
#[derive(Clone)]
pub struct TokenAccountant {
    tokenizer: Arc<dyn Tokenizer>,
}

static SHARED_ACCOUNTANT: OnceLock<TokenAccountant> = OnceLock::new();

impl TokenAccountant {
    pub fn new(tokenizer: impl Tokenizer + 'static) -> Self {
        Self {
            tokenizer: Arc::new(tokenizer),
        }
    }

    /// Process-wide accountant using BPE when available.
    pub fn shared() -> &'static TokenAccountant {
        SHARED_ACCOUNTANT.get_or_init(|| match BpeTokenizer::cl100k() {
            Ok(bpe) => Self::new(bpe),
            Err(err) => {
                tracing::warn!(error = %err, "falling back to character-estimate token counts");
                Self::new(CharEstimateTokenizer)
            }
        })
    }

    pub fn cost_of_part(&self, part: &Part) -> usize {
        match part {
            Part::Text { text } => self.count(text),
            Part::InlineData { .. } => INLINE_DATA_TOKENS,
            Part::FunctionCall { .. } | Part::FunctionResponse { .. } => {
                match serde_json::to_string(part) {
                    Ok(serialized) => self.count(&serialized),
                    Err(err) => {
                        tracing::debug!(error = %err, "unserializable part priced at zero");
                        0
                    }
                }
            }
            Part::Unknown(_) => 0,
        }
    }

    /// Role label plus every part. Unknown roles cost only their parts.
    pub fn cost_of_turn(&self, turn: &Turn) -> usize {
        let label = if turn.role.is_unknown() {
            0
        } else {
            self.count(turn.role.as_str())
        };
        turn.parts
            .iter()
            .fold(label, |acc, part| acc.saturating_add(self.cost_of_part(part)))
    }

    pub fn cost_of_turns(&self, turns: &[Turn]) -> usize {
        turns
            .iter()
            .fold(0usize, |acc, turn| acc.saturating_add(self.cost_of_turn(turn)))
    }

    pub fn cost_of_history(&self, history: &History) -> usize {
        self.cost_of_turns(history.turns())
    }

    fn count(&self, text: &str) -> usize {
        match self.tokenizer.count_tokens(text) {
            Ok(count) => count,
            Err(err) => {
                tracing::debug!(error = %err, "tokenizer failure priced at zero");
                0
            }
        }
    }
}

impl fmt::Debug for TokenAccountant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenAccountant").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
