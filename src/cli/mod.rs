//! CLI module for campdir
//!
//! Provides command-line interface for:
//! - serve: Load config, seed the store and run the HTTP API
//! - translate: Print the query plan for a list query string

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{build_state, parse_query_string, run, run_command, serve, translate};
pub use errors::{CliError, CliErrorCode, CliResult};
