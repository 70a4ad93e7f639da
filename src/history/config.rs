//! Compaction budget settings stored under `[history]`.

use serde::{Deserialize, Serialize};

pub const DEFAULT_COMPRESS_AFTER: usize = 100_000;
pub const DEFAULT_TRUNCATE_AFTER: usize = 150_000;
pub const DEFAULT_TRUNCATE_BY: f64 = 0.8;
pub const DEFAULT_MIN_STARTING_TOKENS: usize = 8_000;
pub const DEFAULT_ADDITIONAL_COMPRESSED: usize = 20_000;
pub const DEFAULT_COMPRESSION_CHAR_LIMIT: usize = 560;

/// Built-in behavior for the compression-only band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompressionMode {
    #[default]
    None,
    OldestFirst,
}

/// Token thresholds and knobs for [`super::Compactor`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CompactionConfig {
    /// Above this total the compression band starts.
    pub compress_after: usize,
    /// Above this total the history is truncated.
    pub truncate_after: usize,
    /// Truncation target. `<= 1` is a fraction of `truncate_after`,
    /// anything larger is an absolute token count.
    pub truncate_by: Option<f64>,
    /// Minimum tokens kept from the start of the conversation.
    pub min_starting_tokens: usize,
    /// Extra room granted to turns that only fit after compression.
    pub additional_compressed: usize,
    /// Characters kept from each compressed string.
    pub compression_char_limit: usize,
    pub truncate_new_tag: bool,
    pub compress_new_tag: bool,
    pub compression: CompressionMode,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            compress_after: DEFAULT_COMPRESS_AFTER,
            truncate_after: DEFAULT_TRUNCATE_AFTER,
            truncate_by: Some(DEFAULT_TRUNCATE_BY),
            min_starting_tokens: DEFAULT_MIN_STARTING_TOKENS,
            additional_compressed: DEFAULT_ADDITIONAL_COMPRESSED,
            compression_char_limit: DEFAULT_COMPRESSION_CHAR_LIMIT,
            truncate_new_tag: false,
            compress_new_tag: false,
            compression: CompressionMode::None,
        }
    }
}

impl CompactionConfig {
    /// Token count the truncation pass aims for.
    pub fn target_tokens(&self) -> usize {
        let truncate_by = self
            .truncate_by
            .filter(|value| value.is_finite() && *value > 0.0)
            .unwrap_or(DEFAULT_TRUNCATE_BY);
        if truncate_by <= 1.0 {
            (self.truncate_after as f64 * truncate_by).floor() as usize
        } else {
            truncate_by.floor() as usize
        }
    }

    /// Human-readable problems with the thresholds. Nothing is rejected.
    pub fn diagnostics(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.truncate_after <= self.compress_after {
            out.push(format!(
                "history.truncate_after ({}) is not above history.compress_after ({}); \
                 the compression band is empty",
                self.truncate_after, self.compress_after
            ));
        }
        if self.target_tokens() > self.truncate_after {
            out.push(format!(
                "history.truncate_by resolves to {} tokens, above truncate_after ({})",
                self.target_tokens(),
                self.truncate_after
            ));
        }
        out
    }
}
