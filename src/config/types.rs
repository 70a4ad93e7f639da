//! Configuration data model.

use crate::api::GenerationConfig;
use crate::history::CompactionConfig;
use serde::Deserialize;
use std::path::PathBuf;

use super::defaults::DEFAULT_CHECKPOINT_DIR;

/// Top-level configuration, one section per concern.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `[history]` compaction budget.
    pub history: CompactionConfig,
    /// `[generation]` request settings.
    pub generation: GenerationConfig,
    pub checkpoint: CheckpointConfig,
}

/// `[checkpoint]` storage settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    /// Root directory; checkpoints live in `<dir>/checkpoints/`.
    pub dir: PathBuf,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_CHECKPOINT_DIR),
        }
    }
}

/// Where the configuration text came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicit `--config` path.
    Explicit(PathBuf),
    /// `./parley.toml`.
    Local,
    /// `<config root>/parley/parley.toml`.
    Global(PathBuf),
    /// No file found; built-in defaults were used.
    BuiltInDefaults,
}

/// Non-fatal problems noticed while loading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDiagnostics {
    pub warnings: Vec<String>,
}

/// Configuration payload plus load-time diagnostics.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub source: ConfigSource,
    pub diagnostics: ConfigDiagnostics,
}
