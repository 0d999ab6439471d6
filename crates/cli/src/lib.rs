//! Command-line front end for monorail.
//!
//! Wires discovery, the package graph, change detection and filtering
//! together behind a small set of subcommands. The binary in `main.rs` only
//! parses arguments, installs tracing and maps errors to exit codes.

#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod output;
pub mod tracing;

pub use cli::{Cli, CliError, Commands, exit_code_for, parse, render_error};
pub use commands::run;
