//! Tracing setup for the monorail CLI.
//!
//! Library crates only emit events; this module installs the subscriber
//! that writes them to stderr.

use std::io;
pub use tracing::Level;
use tracing_subscriber::filter::EnvFilter;

/// Crates whose events are shown.
const TARGETS: [&str; 4] = [
    "monorail",
    "monorail_workspace",
    "monorail_package_graph",
    "monorail_changes",
];

/// Log level options for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    /// Show all logs (trace level)
    Trace,
    /// Show debug and above
    Debug,
    /// Show info and above
    Info,
    /// Show warnings and above (default)
    Warn,
    /// Show errors only
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

fn directives(level: Level) -> String {
    let level = level.as_str().to_lowercase();
    TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Build the event filter.
///
/// An explicit `level` wins; otherwise `RUST_LOG` is used, falling back to
/// warnings only.
///
/// # Errors
///
/// Returns an error if the resulting directives are invalid.
pub fn build_filter(level: Option<LogLevel>) -> miette::Result<EnvFilter> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(directives(level.into())),
        None => EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(directives(Level::WARN))),
    };
    filter.map_err(|e| miette::miette!("Failed to create tracing filter: {e}"))
}

/// Install the stderr subscriber.
///
/// # Errors
///
/// Returns an error if the filter is invalid or a subscriber is already set.
pub fn init_tracing(level: Option<LogLevel>) -> miette::Result<()> {
    let filter = build_filter(level)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .try_init()
        .map_err(|e| miette::miette!("Failed to install tracing subscriber: {e}"))?;

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "Tracing initialized");
    Ok(())
}
