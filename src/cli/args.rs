//! CLI argument definitions using clap
//!
//! Commands:
//! - campdir serve [--config <path>] [--port <port>]
//! - campdir translate <query string>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// campdir - bootcamp directory API server
#[derive(Parser, Debug)]
#[command(name = "campdir")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP API server
    Serve {
        /// Path to configuration file; defaults plus environment when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Translate a list query string and print the resulting plan as JSON
    Translate {
        /// Query string, e.g. `averageCost[lte]=10000&select=name&sort=-name`
        query: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
