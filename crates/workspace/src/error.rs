//! Error types for manifest, configuration and discovery operations.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for workspace operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading manifests, configuration or discovering packages.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Manifest file not found.
    #[error("Manifest file not found at path: {path}")]
    #[diagnostic(
        code(monorail::workspace::manifest_not_found),
        help("Ensure a package.json exists in every directory matched by the package globs")
    )]
    ManifestNotFound {
        /// The path where the manifest was expected.
        path: PathBuf,
    },

    /// A manifest was readable but is missing required fields or has the wrong shape.
    #[error("Invalid package manifest at {path}: {message}")]
    #[diagnostic(
        code(monorail::workspace::invalid_manifest),
        help("Every package manifest needs a string \"name\" and object-valued dependency maps")
    )]
    InvalidManifest {
        /// Path to the invalid manifest.
        path: PathBuf,
        /// Description of what is invalid.
        message: String,
    },

    /// Invalid project configuration.
    #[error("Invalid project configuration at {path}: {message}")]
    #[diagnostic(
        code(monorail::workspace::invalid_config),
        help("Check monorail.json for syntax errors or fields with the wrong type")
    )]
    InvalidConfig {
        /// Path to the invalid configuration file.
        path: PathBuf,
        /// Description of what is invalid.
        message: String,
    },

    /// A package glob could not be compiled.
    #[error("Invalid package glob '{pattern}': {message}")]
    #[diagnostic(
        code(monorail::workspace::invalid_pattern),
        help("Package globs use shell-style wildcards, e.g. 'packages/*' or 'apps/**'")
    )]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Why it was rejected.
        message: String,
    },

    /// I/O error occurred.
    #[error("I/O error during {operation}{}: {source}", path.as_ref().map(|p| format!(" at {}", p.display())).unwrap_or_default())]
    #[diagnostic(
        code(monorail::workspace::io_error),
        help("Check that the referenced paths exist and that you have permission to read them")
    )]
    Io {
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
        /// Optional path where the error occurred.
        path: Option<PathBuf>,
        /// Description of the operation being performed.
        operation: String,
    },

    /// JSON parsing error.
    #[error("JSON parsing error{}: {source}", path.as_ref().map(|p| format!(" in {}", p.display())).unwrap_or_default())]
    #[diagnostic(
        code(monorail::workspace::json_error),
        help("Ensure the file contains valid JSON")
    )]
    Json {
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
        /// Optional path to the file being parsed.
        path: Option<PathBuf>,
    },
}

impl Error {
    /// Create an invalid manifest error.
    #[must_use]
    pub fn invalid_manifest(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InvalidManifest {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Short machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ManifestNotFound { .. } | Self::InvalidManifest { .. } | Self::Json { .. } => {
                "EMANIFEST"
            }
            Self::InvalidConfig { .. } | Self::InvalidPattern { .. } => "ECONFIG",
            Self::Io { .. } => "EIO",
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            source,
            path: None,
            operation: "file operation".to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Self::Json { source, path: None }
    }
}
