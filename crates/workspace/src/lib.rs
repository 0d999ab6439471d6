//! Package manifests, project configuration and package discovery for monorail.
//!
//! This crate turns a repository on disk into the flat list of [`Package`]
//! records that the dependency graph is built from. It owns no graph logic.
//!
//! # Core Types
//!
//! - [`Package`] - A normalized `package.json`: name, version, location and the
//!   four dependency maps
//! - [`ProjectConfig`] - The `monorail.json` project configuration
//! - [`GraphType`] / [`GraphConfig`] - Which dependency maps form graph edges
//!
//! # Example
//!
//! ```rust,ignore
//! use monorail_workspace::{ProjectConfig, discover_packages};
//! use std::path::Path;
//!
//! let root = Path::new("/path/to/repo");
//! let config = ProjectConfig::load(root)?;
//!
//! for package in discover_packages(root, &config)? {
//!     println!("{} at {}", package.name, package.location.display());
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod config;
pub mod discovery;
pub mod error;
pub mod package;

pub use config::{
    CONFIG_FILE_NAME, GraphConfig, GraphType, INDEPENDENT_VERSION, ProjectConfig,
};
pub use discovery::{discover_packages, resolve_glob_patterns};
pub use error::{Error, Result};
pub use package::{DependencyMap, MANIFEST_FILE_NAME, Package};
