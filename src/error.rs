//! Unified error types for the conversation core.

use std::fmt;

// ---------------------------------------------------------------------------
// TokenizerError
// ---------------------------------------------------------------------------

/// Errors raised by a [`crate::tokens::Tokenizer`].
///
/// The accountant never propagates these: a failing part is priced at zero.
#[derive(Debug)]
pub enum TokenizerError {
    /// The tokenizer tables could not be loaded.
    Unavailable(String),
    /// Encoding a specific input failed.
    Failed(String),
}

impl fmt::Display for TokenizerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "tokenizer unavailable: {msg}"),
            Self::Failed(msg) => write!(f, "tokenization failed: {msg}"),
        }
    }
}

impl std::error::Error for TokenizerError {}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors when loading or parsing configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Toml(toml::de::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Toml(e) => write!(f, "toml: {e}"),
            Self::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml(e)
    }
}

// ---------------------------------------------------------------------------
// CheckpointError
// ---------------------------------------------------------------------------

/// Errors from a checkpoint gateway. Propagated to the caller, never retried.
#[derive(Debug)]
pub enum CheckpointError {
    Io(std::io::Error),
    Json(serde_json::Error),
    /// Tag cannot be used to address storage.
    InvalidTag(String),
}

impl fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Json(e) => write!(f, "json: {e}"),
            Self::InvalidTag(msg) => write!(f, "invalid session tag: {msg}"),
        }
    }
}

impl std::error::Error for CheckpointError {}

impl From<std::io::Error> for CheckpointError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for CheckpointError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

// ---------------------------------------------------------------------------
// ParleyError — top-level
// ---------------------------------------------------------------------------

/// Top-level error type for binaries and embedding callers.
#[derive(Debug)]
pub enum ParleyError {
    Config(ConfigError),
    Checkpoint(CheckpointError),
    /// No checkpoint matched the requested tag or `last`.
    NoCheckpoint,
    /// The wire request could not be serialized.
    Render(serde_json::Error),
}

impl fmt::Display for ParleyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Checkpoint(e) => write!(f, "checkpoint: {e}"),
            Self::NoCheckpoint => write!(f, "no checkpoint found"),
            Self::Render(e) => write!(f, "render: {e}"),
        }
    }
}

impl std::error::Error for ParleyError {}

impl From<ConfigError> for ParleyError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<CheckpointError> for ParleyError {
    fn from(e: CheckpointError) -> Self {
        Self::Checkpoint(e)
    }
}
