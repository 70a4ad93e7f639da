//! Environment overrides.

use std::path::PathBuf;

use crate::error::ConfigError;

use super::defaults::{ENV_CHECKPOINT_DIR, ENV_COMPRESS_AFTER, ENV_MODEL, ENV_TRUNCATE_AFTER};
use super::Config;

pub(super) fn apply_env_overrides<FEnv>(
    config: &mut Config,
    env_lookup: &FEnv,
) -> Result<(), ConfigError>
where
    FEnv: Fn(&str) -> Option<String>,
{
    if let Some(model) = non_blank(env_lookup, ENV_MODEL) {
        config.generation.model = model;
    }
    if let Some(dir) = non_blank(env_lookup, ENV_CHECKPOINT_DIR) {
        config.checkpoint.dir = PathBuf::from(dir);
    }
    if let Some(raw) = non_blank(env_lookup, ENV_COMPRESS_AFTER) {
        config.history.compress_after = parse_tokens(ENV_COMPRESS_AFTER, &raw)?;
    }
    if let Some(raw) = non_blank(env_lookup, ENV_TRUNCATE_AFTER) {
        config.history.truncate_after = parse_tokens(ENV_TRUNCATE_AFTER, &raw)?;
    }
    Ok(())
}

fn non_blank<FEnv>(env_lookup: &FEnv, name: &str) -> Option<String>
where
    FEnv: Fn(&str) -> Option<String>,
{
    env_lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_tokens(name: &str, raw: &str) -> Result<usize, ConfigError> {
    raw.replace('_', "").parse::<usize>().map_err(|_| {
        ConfigError::Invalid(format!(
            "invalid {name} value `{raw}`: expected a non-negative token count"
        ))
    })
}
