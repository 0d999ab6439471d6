//! Error types for change detection and package filtering.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for change detection operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while detecting changes or filtering packages.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// A git invocation failed or produced unusable output.
    #[error("git {command} failed: {message}")]
    #[diagnostic(
        code(monorail::changes::git),
        help("Run the command from inside a git repository with at least one commit")
    )]
    Git {
        /// The git arguments that were run.
        command: String,
        /// Stderr or a description of the failure.
        message: String,
    },

    /// Spawning git failed.
    #[error("Failed to run git in {}: {source}", cwd.display())]
    #[diagnostic(
        code(monorail::changes::git_spawn),
        help("Ensure git is installed and on PATH")
    )]
    Spawn {
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
        /// Working directory git was started in.
        cwd: PathBuf,
    },

    /// Filtering left no packages.
    #[error("No packages remain after filtering {}", format_patterns(.patterns))]
    #[diagnostic(
        code(monorail::changes::no_packages_matched),
        help("Check --scope and --ignore, or pass --continue-if-no-match")
    )]
    NoPackagesMatched {
        /// The include and negated exclude patterns that were applied.
        patterns: Vec<String>,
    },

    /// A package name or file glob could not be compiled.
    #[error("Invalid glob '{pattern}': {message}")]
    #[diagnostic(
        code(monorail::changes::invalid_pattern),
        help("Globs use shell-style wildcards, e.g. '@scope/*' or '*.md'")
    )]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Why it was rejected.
        message: String,
    },

    /// Package graph error.
    #[error(transparent)]
    #[diagnostic(code(monorail::changes::graph))]
    Graph(#[from] monorail_package_graph::Error),

    /// Workspace error.
    #[error(transparent)]
    #[diagnostic(code(monorail::changes::workspace))]
    Workspace(#[from] monorail_workspace::Error),
}

fn format_patterns(patterns: &[String]) -> String {
    let quoted: Vec<String> = patterns.iter().map(|p| format!("\"{p}\"")).collect();
    format!("[{}]", quoted.join(", "))
}

impl Error {
    /// Create a git failure error.
    #[must_use]
    pub fn git(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Git {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Create an invalid pattern error.
    #[must_use]
    pub fn invalid_pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// Short machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Git { .. } | Self::Spawn { .. } => "EGIT",
            Self::NoPackagesMatched { .. } | Self::InvalidPattern { .. } => "EFILTER",
            Self::Graph(inner) => inner.code(),
            Self::Workspace(inner) => inner.code(),
        }
    }
}
