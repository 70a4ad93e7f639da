//! CLI argument parsing via clap.

use clap::{Parser, Subcommand};
use parley::build_info;
use std::path::PathBuf;

/// Inspect, compact and render checkpointed conversations.
#[derive(Debug, Parser)]
#[command(
    name = "parley",
    version = build_info::CLI_VERSION_TEXT,
    after_help = build_info::HELP_BUILD_METADATA
)]
pub struct Args {
    /// Path to config file (default: ./parley.toml or ~/.config/parley/parley.toml).
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show token and turn counts for a checkpoint.
    Stats {
        /// Session tag, or `last` for the most recent checkpoint.
        #[arg(default_value = "last")]
        tag: String,
    },
    /// Apply the compaction policy and save the result.
    Compact {
        #[arg(default_value = "last")]
        tag: String,
        /// Report what would change without writing a checkpoint.
        #[arg(long = "dry-run")]
        dry_run: bool,
    },
    /// Print the chat-completions request JSON for a checkpoint.
    Render {
        #[arg(default_value = "last")]
        tag: String,
    },
}
