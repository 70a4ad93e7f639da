//! Token-budget-driven history compaction.
//!
//! At each decision point the [`Compactor`] measures the session history and
//! picks one of three outcomes:
//!
//! - at or below `compress_after`: nothing happens, tag included;
//! - above `truncate_after`: the middle of the conversation is dropped,
//!   keeping a starting window (task setup) and an ending window (recent
//!   context), with older tail turns compressed when that lets them fit;
//! - in between: the configured [`CompressionStrategy`] runs.
//!
//! Whatever happens, tool calls and tool responses stay paired.

pub mod compress;
pub mod config;
pub mod pairing;
pub mod strategy;

pub use compress::{compress_text, compress_turn, TRUNCATION_MARKER};
pub use config::{CompactionConfig, CompressionMode};
pub use pairing::{PartRef, ToolPairing};
pub use strategy::{
    CompressionContext, CompressionStrategy, NoopCompression, OldestFirstCompression,
};

use crate::session::Session;
use crate::tokens::TokenAccountant;
use crate::types::Turn;
use pairing::repair_tool_pairing;
use std::fmt;

/// Which branch a compaction took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompactionAction {
    Unchanged,
    Truncated,
    Compressed,
}

impl CompactionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unchanged => "unchanged",
            Self::Truncated => "truncated",
            Self::Compressed => "compressed",
        }
    }
}

/// Details about one compaction decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactionReport {
    pub action: CompactionAction,
    pub tokens_before: usize,
    pub tokens_after: usize,
    pub turns_before: usize,
    pub turns_after: usize,
    pub compressed_turns: usize,
    pub tag_forked: bool,
}

impl CompactionReport {
    fn unchanged(tokens: usize, turns: usize) -> Self {
        Self {
            action: CompactionAction::Unchanged,
            tokens_before: tokens,
            tokens_after: tokens,
            turns_before: turns,
            turns_after: turns,
            compressed_turns: 0,
            tag_forked: false,
        }
    }

    pub fn changed(&self) -> bool {
        self.action != CompactionAction::Unchanged
    }
}

/// Keeps a session history inside its token budget.
pub struct Compactor {
    config: CompactionConfig,
    accountant: TokenAccountant,
    strategy: Box<dyn CompressionStrategy>,
}

impl Compactor {
    /// Compactor using the strategy selected by `config.compression`.
    pub fn new(config: CompactionConfig, accountant: TokenAccountant) -> Self {
        let strategy: Box<dyn CompressionStrategy> = match config.compression {
            CompressionMode::None => Box::new(NoopCompression),
            CompressionMode::OldestFirst => Box::new(OldestFirstCompression),
        };
        Self {
            config,
            accountant,
            strategy,
        }
    }

    /// Replace the compression-band strategy.
    pub fn with_strategy(mut self, strategy: impl CompressionStrategy + 'static) -> Self {
        self.strategy = Box::new(strategy);
        self
    }

    pub fn config(&self) -> &CompactionConfig {
        &self.config
    }

    pub fn accountant(&self) -> &TokenAccountant {
        &self.accountant
    }

    /// Measure the session and truncate or compress it as configured.
    ///
    /// Never fails; the history is always left structurally valid.
    pub fn compact(&self, session: &mut Session) -> CompactionReport {
        let tokens_before = self.accountant.cost_of_history(&session.history);
        let turns_before = session.history.len();

        if tokens_before <= self.config.compress_after {
            return CompactionReport::unchanged(tokens_before, turns_before);
        }

        if tokens_before > self.config.truncate_after {
            let tag_forked = self.config.truncate_new_tag || session.tag.is_none();
            if tag_forked {
                session.fork_tag();
            }
            let turns = std::mem::take(session.history.turns_mut());
            let (kept, compressed_turns) = self.truncate(turns);
            *session.history.turns_mut() = kept;
            let report = CompactionReport {
                action: CompactionAction::Truncated,
                tokens_before,
                tokens_after: self.accountant.cost_of_history(&session.history),
                turns_before,
                turns_after: session.history.len(),
                compressed_turns,
                tag_forked,
            };
            tracing::info!(
                tokens_before,
                tokens_after = report.tokens_after,
                turns_before,
                turns_after = report.turns_after,
                compressed_turns,
                tag = ?session.tag.as_ref().map(|tag| tag.as_str()),
                "truncated history"
            );
            return report;
        }

        let ctx = CompressionContext {
            accountant: &self.accountant,
            config: &self.config,
            total_tokens: tokens_before,
        };
        let compressed_turns = self.strategy.compress(&mut session.history, &ctx);
        if compressed_turns == 0 {
            tracing::debug!(tokens_before, "compression band reached; strategy made no change");
            return CompactionReport::unchanged(tokens_before, turns_before);
        }
        repair_tool_pairing(session.history.turns_mut());
        let tag_forked = self.config.compress_new_tag || session.tag.is_none();
        if tag_forked {
            session.fork_tag();
        }
        let report = CompactionReport {
            action: CompactionAction::Compressed,
            tokens_before,
            tokens_after: self.accountant.cost_of_history(&session.history),
            turns_before,
            turns_after: session.history.len(),
            compressed_turns,
            tag_forked,
        };
        tracing::info!(
            tokens_before,
            tokens_after = report.tokens_after,
            compressed_turns,
            "compressed history"
        );
        report
    }

    /// Keep a starting and an ending window, then repair pairing.
    /// Returns the kept turns and how many of them were compressed.
    fn truncate(&self, mut turns: Vec<Turn>) -> (Vec<Turn>, usize) {
        let min_start = self.config.min_starting_tokens;
        let mut start_len = 0usize;
        let mut start_tokens = 0usize;
        while start_len < turns.len() && start_tokens < min_start {
            let cost = self.accountant.cost_of_turn(&turns[start_len]);
            if start_tokens.saturating_add(cost) > min_start && start_len >= 2 {
                break;
            }
            start_tokens = start_tokens.saturating_add(cost);
            start_len += 1;
        }

        // Signed: the starting window alone may already exceed the target.
        let budget = self.config.target_tokens() as i64 - start_tokens as i64;
        let compressed_budget = budget + self.config.additional_compressed as i64;

        let mut tail = turns.split_off(start_len);
        let mut end = Vec::new();
        let mut end_tokens = 0i64;
        let mut compressed_turns = 0usize;
        while let Some(mut turn) = tail.pop() {
            let cost = self.accountant.cost_of_turn(&turn) as i64;
            if end_tokens + cost <= budget {
                end_tokens += cost;
                end.push(turn);
                continue;
            }
            if !compress_turn(&mut turn, self.config.compression_char_limit) {
                break;
            }
            let cost = self.accountant.cost_of_turn(&turn) as i64;
            if end_tokens + cost > compressed_budget {
                break;
            }
            end_tokens += cost;
            compressed_turns += 1;
            end.push(turn);
        }
        let dropped = tail.len();

        turns.extend(end.into_iter().rev());
        let repaired = repair_tool_pairing(&mut turns);
        tracing::debug!(
            start_len,
            start_tokens,
            dropped,
            compressed_turns,
            repaired,
            "truncation windows"
        );
        (turns, compressed_turns)
    }
}

impl fmt::Debug for Compactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compactor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
