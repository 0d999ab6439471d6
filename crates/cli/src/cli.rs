use crate::tracing::LogLevel;
use clap::{Args, Parser, Subcommand, ValueEnum};
use miette::{Diagnostic, Report};
use monorail_changes::FilterOptions;
use monorail_workspace::{GraphConfig, GraphType};
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the CLI application
pub const EXIT_OK: i32 = 0;
/// Unexpected failure exit code
pub const EXIT_OTHER: i32 = 1;
/// CLI, configuration or manifest error exit code
pub const EXIT_CLI: i32 = 2;
/// Repository validation error exit code (duplicate names, cycles, filters)
pub const EXIT_VALIDATION: i32 = 3;

/// CLI-specific error types with proper exit code mapping
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// CLI, configuration or manifest error (exit code 2)
    #[error("{message}")]
    #[diagnostic(code(monorail::cli::config))]
    Config {
        /// Short machine-readable code of the underlying error
        code: String,
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// The repository cannot be reasoned about (exit code 3)
    #[error("{message}")]
    #[diagnostic(code(monorail::cli::validation))]
    Validation {
        /// Short machine-readable code of the underlying error
        code: String,
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// Other unexpected error (exit code 1)
    #[error("{message}")]
    #[diagnostic(code(monorail::cli::other))]
    Other {
        /// Short machine-readable code of the underlying error
        code: String,
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    /// Create a new configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            code: "ECONFIG".to_string(),
            message: message.into(),
            help: None,
        }
    }

    /// Create a new other error
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            code: "EOTHER".to_string(),
            message: message.into(),
            help: None,
        }
    }

    /// Short machine-readable code.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::Config { code, .. } | Self::Validation { code, .. } | Self::Other { code, .. } => {
                code
            }
        }
    }

    /// Classify a library error by its short code, keeping its help text.
    fn classify<E: Diagnostic>(code: &'static str, err: &E) -> Self {
        let message = err.to_string();
        let help = err.help().map(|h| h.to_string());
        let code = code.to_string();
        match code.as_str() {
            "ECONFIG" | "EMANIFEST" | "EIO" => Self::Config {
                code,
                message,
                help,
            },
            "ENAME" | "ECYCLE" | "ESPEC" | "EWORKSPACE" | "EFILTER" => Self::Validation {
                code,
                message,
                help,
            },
            _ => Self::Other {
                code,
                message,
                help,
            },
        }
    }
}

impl From<monorail_workspace::Error> for CliError {
    fn from(err: monorail_workspace::Error) -> Self {
        Self::classify(err.code(), &err)
    }
}

impl From<monorail_package_graph::Error> for CliError {
    fn from(err: monorail_package_graph::Error) -> Self {
        Self::classify(err.code(), &err)
    }
}

impl From<monorail_changes::Error> for CliError {
    fn from(err: monorail_changes::Error) -> Self {
        Self::classify(err.code(), &err)
    }
}

/// Map CLI error to appropriate exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Config { .. } => EXIT_CLI,
        CliError::Validation { .. } => EXIT_VALIDATION,
        CliError::Other { .. } => EXIT_OTHER,
    }
}

/// Render error appropriately based on JSON flag
#[allow(clippy::print_stdout, clippy::print_stderr)]
pub fn render_error(err: &CliError, json_mode: bool) {
    if json_mode {
        let envelope = ErrorEnvelope::new(serde_json::json!({
            "code": err.code(),
            "message": err.to_string(),
        }));

        match serde_json::to_string(&envelope) {
            Ok(json) => println!("{json}"),
            Err(_) => eprintln!("Error serializing error response"),
        }
    } else {
        let report = Report::new(err.clone());
        eprintln!("{report:?}");
        let _ = io::stderr().flush();
    }
}

/// Success response envelope for JSON output
#[derive(Debug, Clone, Serialize)]
pub struct OkEnvelope<T> {
    /// Status indicator - always "ok" for success
    pub status: &'static str,
    /// The actual data payload
    pub data: T,
}

impl<T> OkEnvelope<T> {
    /// Create a new success envelope
    #[must_use]
    pub const fn new(data: T) -> Self {
        Self { status: "ok", data }
    }
}

/// Error response envelope for JSON output
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope<E> {
    /// Status indicator - always "error" for failures
    pub status: &'static str,
    /// The error details
    pub error: E,
}

impl<E> ErrorEnvelope<E> {
    /// Create a new error envelope
    #[must_use]
    pub const fn new(error: E) -> Self {
        Self {
            status: "error",
            error,
        }
    }
}

/// Inspect the local packages of a JavaScript monorepo and plan work over
/// their dependency graph.
#[derive(Parser, Debug)]
#[command(name = "monorail")]
#[command(about = "Inspect monorepo packages and plan work over their dependency graph")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Repository root (defaults to the current directory).
    #[arg(long, global = true, env = "MONORAIL_CWD", value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Logging verbosity level; overrides RUST_LOG.
    #[arg(short = 'L', long = "log-level", global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Emit a JSON envelope instead of text.
    #[arg(long, global = true)]
    pub json: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the selected packages.
    List {
        /// Package selection.
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Show each selected package with its local dependencies.
    Graph {
        /// Package selection.
        #[command(flatten)]
        filter: FilterArgs,

        /// Graph construction settings.
        #[command(flatten)]
        graph: GraphArgs,

        /// Include external dependencies too.
        #[arg(long)]
        all: bool,
    },

    /// Group the selected packages into batches that can run in parallel.
    Batches {
        /// Package selection.
        #[command(flatten)]
        filter: FilterArgs,

        /// Graph construction settings.
        #[command(flatten)]
        graph: GraphArgs,
    },

    /// Print the selected packages with dependencies first.
    Toposort {
        /// Package selection.
        #[command(flatten)]
        filter: FilterArgs,

        /// Graph construction settings.
        #[command(flatten)]
        graph: GraphArgs,
    },

    /// List packages changed since the last release.
    Changed {
        /// Change detection settings.
        #[command(flatten)]
        changes: ChangedArgs,

        /// Graph construction settings.
        #[command(flatten)]
        graph: GraphArgs,
    },

    /// Report every dependency cycle.
    Cycles {
        /// Graph construction settings.
        #[command(flatten)]
        graph: GraphArgs,
    },
}

/// Package selection flags shared by most commands.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterArgs {
    /// Only include packages with names matching the glob.
    #[arg(long, value_name = "GLOB")]
    pub scope: Vec<String>,

    /// Exclude packages with names matching the glob.
    #[arg(long, value_name = "GLOB")]
    pub ignore: Vec<String>,

    /// Exclude packages marked private.
    #[arg(long = "no-private")]
    pub no_private: bool,

    /// Only include packages changed since REF (the last tag when omitted).
    #[arg(long, value_name = "REF", num_args = 0..=1, default_missing_value = "")]
    pub since: Option<String>,

    /// With --since, do not include dependents of changed packages.
    #[arg(long)]
    pub exclude_dependents: bool,

    /// Include every package depending on a selected package.
    #[arg(long)]
    pub include_dependents: bool,

    /// Include every package a selected package depends on.
    #[arg(long)]
    pub include_dependencies: bool,

    /// Do not fail when nothing is selected.
    #[arg(long)]
    pub continue_if_no_match: bool,

    /// With --since, consider tags on merged branches.
    #[arg(long)]
    pub include_merged_tags: bool,
}

impl FilterArgs {
    /// Convert into library filter options.
    #[must_use]
    pub fn to_options(&self) -> FilterOptions {
        FilterOptions {
            scope: self.scope.clone(),
            ignore: self.ignore.clone(),
            show_private: !self.no_private,
            since: self.since.clone(),
            exclude_dependents: self.exclude_dependents,
            include_dependents: self.include_dependents,
            include_dependencies: self.include_dependencies,
            continue_if_no_match: self.continue_if_no_match,
            include_merged_tags: self.include_merged_tags,
        }
    }
}

/// Dependency maps that form graph edges.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum GraphTypeArg {
    /// Only `dependencies`, `optionalDependencies` and `peerDependencies`.
    Dependencies,
    /// Every dependency map, `devDependencies` included.
    AllDependencies,
}

impl From<GraphTypeArg> for GraphType {
    fn from(arg: GraphTypeArg) -> Self {
        match arg {
            GraphTypeArg::Dependencies => Self::Dependencies,
            GraphTypeArg::AllDependencies => Self::AllDependencies,
        }
    }
}

/// Graph construction flags; unset flags fall back to `monorail.json`.
#[derive(Args, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphArgs {
    /// Dependency maps that form graph edges.
    #[arg(long, value_enum)]
    pub graph_type: Option<GraphTypeArg>,

    /// Fail when dependency cycles exist.
    #[arg(long)]
    pub reject_cycles: bool,

    /// Link every sibling reference locally regardless of its specifier.
    #[arg(long)]
    pub force_local: bool,
}

impl GraphArgs {
    /// Merge the flags over the project settings.
    #[must_use]
    pub fn resolve(&self, config: &GraphConfig) -> GraphConfig {
        GraphConfig {
            graph_type: self.graph_type.map_or(config.graph_type, GraphType::from),
            force_local: self.force_local || config.force_local,
            reject_cycles: self.reject_cycles || config.reject_cycles,
        }
    }
}

/// Change detection flags for `changed`.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangedArgs {
    /// Always count matching packages as changed ("*" or no value for all).
    #[arg(long, value_name = "GLOB", num_args = 0..=1, default_missing_value = "*")]
    pub force_publish: Vec<String>,

    /// Ignore changed files matching the glob (adds to `ignoreChanges`).
    #[arg(long, value_name = "GLOB")]
    pub ignore_changes: Vec<String>,

    /// Compare only the most recent commit.
    #[arg(long)]
    pub canary: bool,

    /// Consider tags on merged branches.
    #[arg(long)]
    pub include_merged_tags: bool,

    /// Do not include dependents of changed packages.
    #[arg(long)]
    pub exclude_dependents: bool,
}

/// Parse command line arguments into a CLI structure.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}
