//! Configuration loading from TOML files and environment variables.
//!
//! Config is loaded in this order of precedence (highest wins):
//! 1. Environment variables (`PARLEY_MODEL`, `PARLEY_CHECKPOINT_DIR`,
//!    `PARLEY_COMPRESS_AFTER`, `PARLEY_TRUNCATE_AFTER`)
//! 2. TOML file specified via `--config`
//! 3. `./parley.toml` in the current directory
//! 4. `$XDG_CONFIG_HOME/parley/parley.toml` (or `~/.config/parley/parley.toml`)
//! 5. Built-in defaults

mod defaults;
mod env;
mod loader;
mod sources;
mod types;

pub use loader::{load_config, load_config_with_diagnostics};
pub use sources::config_root_dir;
pub use types::{CheckpointConfig, Config, ConfigDiagnostics, ConfigSource, LoadedConfig};
