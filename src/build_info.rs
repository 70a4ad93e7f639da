//! Compile-time build metadata exposed to the CLI.

/// Semver package version from `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// VCS commit hash captured at build time.
pub const GIT_COMMIT: &str = env!("PARLEY_BUILD_GIT_HASH");

/// Build timestamp captured at compile time.
pub const BUILD_TIMESTAMP: &str = env!("PARLEY_BUILD_TIMESTAMP");

/// Help trailer block that surfaces build metadata in `parley --help`.
pub const HELP_BUILD_METADATA: &str = concat!(
    "Build metadata:\n  commit: ",
    env!("PARLEY_BUILD_GIT_HASH"),
    "\n  built: ",
    env!("PARLEY_BUILD_TIMESTAMP")
);

/// Version block printed by `parley --version` after the binary name.
pub const CLI_VERSION_TEXT: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\ncommit: ",
    env!("PARLEY_BUILD_GIT_HASH"),
    "\nbuilt: ",
    env!("PARLEY_BUILD_TIMESTAMP")
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_version_text_includes_expected_lines() {
        let text = CLI_VERSION_TEXT;
        assert!(text.starts_with(VERSION));
        assert!(text.contains(GIT_COMMIT));
        assert!(text.contains("built:"));
    }

    #[test]
    fn help_trailer_names_commit_and_build_time() {
        assert!(HELP_BUILD_METADATA.contains(GIT_COMMIT));
        assert!(HELP_BUILD_METADATA.contains(BUILD_TIMESTAMP));
    }
}
