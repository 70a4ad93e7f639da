//! Pluggable behavior for the compression-only band.

use super::config::CompactionConfig;
use super::compress::compress_turn;
use crate::tokens::TokenAccountant;
use crate::types::History;

/// What a strategy knows about the decision point it runs at.
#[derive(Debug, Clone, Copy)]
pub struct CompressionContext<'a> {
    pub accountant: &'a TokenAccountant,
    pub config: &'a CompactionConfig,
    /// Cost of the history before the strategy runs.
    pub total_tokens: usize,
}

/// Runs when the history sits above `compress_after` but not above
/// `truncate_after`. Returns the number of turns it modified.
pub trait CompressionStrategy: Send + Sync {
    fn compress(&self, history: &mut History, ctx: &CompressionContext<'_>) -> usize;
}

/// Leaves the history untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCompression;

impl CompressionStrategy for NoopCompression {
    fn compress(&self, _history: &mut History, _ctx: &CompressionContext<'_>) -> usize {
        0
    }
}

/// Compresses the oldest turns, past the first `min_starting_tokens`, until
/// the history is back under `compress_after`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OldestFirstCompression;

impl CompressionStrategy for OldestFirstCompression {
    fn compress(&self, history: &mut History, ctx: &CompressionContext<'_>) -> usize {
        let mut total = ctx.total_tokens;
        let mut protected = 0usize;
        let mut changed = 0usize;
        for turn in history.turns_mut().iter_mut() {
            if total <= ctx.config.compress_after {
                break;
            }
            let before = ctx.accountant.cost_of_turn(turn);
            if protected < ctx.config.min_starting_tokens {
                protected = protected.saturating_add(before);
                continue;
            }
            if compress_turn(turn, ctx.config.compression_char_limit) {
                let after = ctx.accountant.cost_of_turn(turn);
                total = total.saturating_sub(before.saturating_sub(after));
                changed += 1;
            }
        }
        changed
    }
}
