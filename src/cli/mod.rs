//! Command-line interface for folder-audit.
//!
//! Provides the `run` and `inspect` commands.

mod commands;

pub use commands::{build_config, parse_cli, run_with_cli, Cli, Commands};
