//! Default configuration constants.

/// Config file name searched in the working directory and config root.
pub(super) const CONFIG_FILE_NAME: &str = "parley.toml";
/// Application directory under the platform config root.
pub(super) const CONFIG_APP_DIR: &str = "parley";
/// Checkpoint root used when `[checkpoint] dir` is not set.
pub(super) const DEFAULT_CHECKPOINT_DIR: &str = ".parley";

pub(super) const ENV_MODEL: &str = "PARLEY_MODEL";
pub(super) const ENV_CHECKPOINT_DIR: &str = "PARLEY_CHECKPOINT_DIR";
pub(super) const ENV_COMPRESS_AFTER: &str = "PARLEY_COMPRESS_AFTER";
pub(super) const ENV_TRUNCATE_AFTER: &str = "PARLEY_TRUNCATE_AFTER";
