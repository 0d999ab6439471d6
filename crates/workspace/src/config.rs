//! Project configuration types.
//!
//! The configuration lives in `monorail.json` at the repository root and is
//! loaded once per command invocation. Everything downstream receives it by
//! reference.

use crate::error::{Error, Result};
use crate::package::MANIFEST_FILE_NAME;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// File name of the project configuration.
pub const CONFIG_FILE_NAME: &str = "monorail.json";

/// Repository version marker for independently versioned packages.
pub const INDEPENDENT_VERSION: &str = "independent";

/// Which dependency maps contribute edges to the package graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GraphType {
    /// `dependencies` and `optionalDependencies` only.
    Dependencies,
    /// `dependencies`, `optionalDependencies` and `devDependencies`.
    #[default]
    AllDependencies,
}

impl GraphType {
    /// Whether `devDependencies` take part in the graph.
    #[must_use]
    pub const fn includes_dev(self) -> bool {
        matches!(self, Self::AllDependencies)
    }
}

impl fmt::Display for GraphType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dependencies => write!(f, "dependencies"),
            Self::AllDependencies => write!(f, "allDependencies"),
        }
    }
}

/// Graph construction and cycle handling settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GraphConfig {
    /// Dependency maps used for edges.
    pub graph_type: GraphType,
    /// Link every sibling reference locally regardless of its specifier.
    pub force_local: bool,
    /// Fail instead of warning when dependency cycles exist.
    pub reject_cycles: bool,
}

/// Complete project configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectConfig {
    /// Package directory globs, relative to the repository root.
    pub packages: Vec<String>,
    /// Take package globs from the root `package.json` `workspaces` field.
    pub use_workspaces: bool,
    /// Repository version, or `"independent"`.
    pub version: Option<String>,
    /// Graph settings.
    pub graph: GraphConfig,
    /// Globs of changed files that never mark a package as updated.
    pub ignore_changes: Vec<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            packages: vec!["packages/*".to_string()],
            use_workspaces: false,
            version: None,
            graph: GraphConfig::default(),
            ignore_changes: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WorkspacesField {
    List(Vec<String>),
    Object {
        #[serde(default)]
        packages: Vec<String>,
    },
}

#[derive(Debug, Deserialize)]
struct RootManifest {
    workspaces: Option<WorkspacesField>,
}

impl ProjectConfig {
    /// Load `monorail.json` from `root`, falling back to defaults when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE_NAME);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No project configuration, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).map_err(|source| Error::Io {
            source,
            path: Some(path.clone()),
            operation: "reading project configuration".to_string(),
        })?;

        serde_json::from_str(&content).map_err(|e| Error::invalid_config(&path, e.to_string()))
    }

    /// Whether packages are versioned independently.
    #[must_use]
    pub fn is_independent(&self) -> bool {
        self.version.as_deref() == Some(INDEPENDENT_VERSION)
    }

    /// Resolve the package globs to use for discovery.
    ///
    /// With `useWorkspaces`, the globs come from the root manifest's
    /// `workspaces` field (either the array or the `{ "packages": [...] }` form).
    ///
    /// # Errors
    ///
    /// Returns an error if the root manifest is needed but missing, unreadable,
    /// or has no `workspaces` field.
    pub fn package_globs(&self, root: &Path) -> Result<Vec<String>> {
        if !self.use_workspaces {
            return Ok(self.packages.clone());
        }

        let path = root.join(MANIFEST_FILE_NAME);
        let content = fs::read_to_string(&path).map_err(|source| Error::Io {
            source,
            path: Some(path.clone()),
            operation: "reading root package manifest".to_string(),
        })?;
        let manifest: RootManifest = serde_json::from_str(&content).map_err(|source| {
            Error::Json {
                source,
                path: Some(path.clone()),
            }
        })?;

        match manifest.workspaces {
            Some(WorkspacesField::List(globs) | WorkspacesField::Object { packages: globs }) => {
                Ok(globs)
            }
            None => Err(Error::invalid_config(
                path,
                "\"useWorkspaces\" is enabled but the root package.json has no \"workspaces\" field",
            )),
        }
    }
}
