//! CLI module for swayfade.
//!
//! Parses the command line, sets up logging and runs the daemon in the
//! foreground.

mod commands;

use clap::Parser;
pub use commands::Cli;
use tracing_subscriber::EnvFilter;

use crate::error::SwayfadeError;

/// Environment variable holding the log filter, e.g. `swayfade=debug`.
pub const LOG_ENV: &str = "SWAYFADE_LOG";

/// Filter used when [`LOG_ENV`] is unset or invalid.
const DEFAULT_LOG_FILTER: &str = "info";

/// Installs the global tracing subscriber, writing to stderr.
///
/// Does nothing if a subscriber is already installed.
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Runs the CLI.
///
/// Parses command-line arguments and executes the daemon.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the daemon fails.
pub fn run() -> Result<(), SwayfadeError> {
    let cli = Cli::parse();
    init_logging();
    cli.execute()
}
