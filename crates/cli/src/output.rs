//! Writing command results to stdout.

use crate::cli::{CliError, OkEnvelope};
use serde::Serialize;
use std::io::{self, Write};

/// A command result that can be shown as text or JSON.
pub trait Render: Serialize {
    /// Human-readable rendering, without a trailing newline.
    fn render_text(&self) -> String;
}

/// Print `value` as text, or as an [`OkEnvelope`] when `json` is set.
///
/// # Errors
///
/// Returns an error if serialization or writing to stdout fails.
pub fn emit<T: Render>(value: &T, json: bool) -> Result<(), CliError> {
    let rendered = if json {
        serde_json::to_string_pretty(&OkEnvelope::new(value))
            .map_err(|e| CliError::other(format!("Failed to serialize output: {e}")))?
    } else {
        value.render_text()
    };

    if rendered.is_empty() {
        return Ok(());
    }

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{rendered}")
        .and_then(|()| stdout.flush())
        .map_err(|e| CliError::other(format!("Failed to write output: {e}")))
}
