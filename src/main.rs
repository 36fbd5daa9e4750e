//! campdir CLI entry point
//!
//! Parses arguments and dispatches through `cli::run`; errors are printed
//! to stderr with a non-zero exit status.

use campdir::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
