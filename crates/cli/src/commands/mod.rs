//! Subcommand implementations.
//!
//! Every command loads the [`Repository`] once, computes a serializable
//! report, and hands it to [`crate::output::emit`].

pub mod batches;
pub mod changed;
pub mod cycles;
pub mod graph;
pub mod list;

use crate::cli::{Cli, CliError, Commands};
use crate::output::emit;
use monorail_changes::GitOracle;
use monorail_package_graph::{GraphOptions, PackageGraph};
use monorail_workspace::{GraphConfig, Package, ProjectConfig, discover_packages};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Tag pattern `git describe` matches in independent mode.
const INDEPENDENT_TAG_MATCH: &str = "*@*";
/// Tag pattern `git describe` matches in fixed mode.
const FIXED_TAG_MATCH: &str = "v*.*.*";

/// A discovered repository: its root, configuration and packages.
#[derive(Debug, Clone)]
pub struct Repository {
    /// Repository root.
    pub root: PathBuf,
    /// Settings from `monorail.json`.
    pub config: ProjectConfig,
    /// Every package found by the package globs, sorted by location.
    pub packages: Vec<Package>,
}

impl Repository {
    /// Load the configuration and discover the packages under `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration or a manifest is invalid.
    pub fn load(root: &Path) -> Result<Self, CliError> {
        let config = ProjectConfig::load(root)?;
        let packages = discover_packages(root, &config)?;
        info!(root = %root.display(), count = packages.len(), "Discovered packages");
        Ok(Self {
            root: root.to_path_buf(),
            config,
            packages,
        })
    }

    /// Build the package graph over every package.
    ///
    /// # Errors
    ///
    /// Returns an error if package names collide or a specifier is invalid.
    pub fn graph(&self, settings: &GraphConfig) -> Result<PackageGraph, CliError> {
        Ok(PackageGraph::with_options(
            &self.packages,
            &GraphOptions::from(settings),
        )?)
    }

    /// A git change oracle rooted at the repository.
    #[must_use]
    pub fn oracle(&self) -> GitOracle {
        let pattern = if self.config.is_independent() {
            INDEPENDENT_TAG_MATCH
        } else {
            FIXED_TAG_MATCH
        };
        GitOracle::new(&self.root).with_tag_match(pattern)
    }
}

/// Short description of a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageSummary {
    /// Package name.
    pub name: String,
    /// Declared version.
    pub version: Option<String>,
    /// Directory of the package.
    pub location: PathBuf,
    /// Whether the package is private.
    pub private: bool,
}

impl From<&Package> for PackageSummary {
    fn from(package: &Package) -> Self {
        Self {
            name: package.name.clone(),
            version: package.version.clone(),
            location: package.location.clone(),
            private: package.private,
        }
    }
}

impl PackageSummary {
    pub(crate) fn render_line(&self, root: &Path) -> String {
        let version = self
            .version
            .as_deref()
            .map_or_else(|| "MISSING".to_string(), |v| format!("v{v}"));
        let location = self.location.strip_prefix(root).unwrap_or(&self.location);
        let private = if self.private { " (PRIVATE)" } else { "" };
        format!("{} {version} {}{private}", self.name, location.display())
    }
}

fn resolve_root(cwd: Option<&Path>) -> Result<PathBuf, CliError> {
    match cwd {
        Some(dir) => Ok(dir.to_path_buf()),
        None => std::env::current_dir()
            .map_err(|e| CliError::config(format!("Cannot determine current directory: {e}"))),
    }
}

/// Run the parsed command line.
///
/// # Errors
///
/// Returns the first error any step produces.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    let root = resolve_root(cli.cwd.as_deref())?;
    debug!(root = %root.display(), command = ?cli.command, "Running command");
    let repository = Repository::load(&root)?;

    match &cli.command {
        Commands::List { filter } => {
            let oracle = repository.oracle();
            emit(&list::execute(&repository, filter, &oracle)?, cli.json)
        }
        Commands::Graph { filter, graph, all } => {
            let oracle = repository.oracle();
            emit(
                &graph::execute(&repository, filter, graph, *all, &oracle)?,
                cli.json,
            )
        }
        Commands::Batches { filter, graph } => {
            let oracle = repository.oracle();
            emit(
                &batches::execute_batches(&repository, filter, graph, &oracle)?,
                cli.json,
            )
        }
        Commands::Toposort { filter, graph } => {
            let oracle = repository.oracle();
            emit(
                &batches::execute_toposort(&repository, filter, graph, &oracle)?,
                cli.json,
            )
        }
        Commands::Changed { changes, graph } => {
            let oracle = repository.oracle();
            emit(
                &changed::execute(&repository, changes, graph, &oracle)?,
                cli.json,
            )
        }
        Commands::Cycles { graph } => emit(&cycles::execute(&repository, graph)?, cli.json),
    }
}
