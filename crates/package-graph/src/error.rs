//! Error types for package graph operations.

use miette::Diagnostic;
use std::fmt::Write as _;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for package graph operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A package name shared by more than one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateName {
    /// The shared name.
    pub name: String,
    /// Every location declaring that name, in input order.
    pub locations: Vec<PathBuf>,
}

/// Errors that can occur while building or ordering the package graph.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Two or more packages share a name.
    #[error("{}", render_duplicates(.duplicates))]
    #[diagnostic(
        code(monorail::package_graph::duplicate_name),
        help("Package names must be unique across the repository; rename or remove the duplicates")
    )]
    DuplicatePackageName {
        /// Each offending name with all of its locations, in first-seen order.
        duplicates: Vec<DuplicateName>,
    },

    /// Dependency cycles exist and cycle rejection was requested.
    #[error("Dependency cycles detected, you should fix these!\n{}", .cycles.join("\n"))]
    #[diagnostic(
        code(monorail::package_graph::cycles_detected),
        help("Break the cycles, or run without --reject-cycles to isolate them instead")
    )]
    CyclesDetected {
        /// Rendering of every detected cycle, e.g. `a -> b -> a`.
        cycles: Vec<String>,
    },

    /// A dependency specifier could not be parsed at all.
    #[error("Invalid dependency specifier \"{name}@{spec}\": {reason}")]
    #[diagnostic(
        code(monorail::package_graph::unresolvable_specifier),
        help("Use a semver range, dist-tag, path, git URL or workspace: specifier")
    )]
    UnresolvableSpecifier {
        /// Dependency name.
        name: String,
        /// The raw specifier.
        spec: String,
        /// Why parsing failed.
        reason: String,
    },

    /// A `workspace:` specifier that the sibling package does not satisfy.
    #[error(
        "Package specification \"{name}@{spec}\" could not be resolved within the workspace. To reference a non-matching, remote version of a local dependency, remove the 'workspace:' prefix."
    )]
    #[diagnostic(code(monorail::package_graph::unsatisfied_workspace_spec))]
    UnsatisfiedWorkspaceSpec {
        /// Dependency name.
        name: String,
        /// The specifier after the `workspace:` prefix was removed.
        spec: String,
    },
}

fn render_duplicates(duplicates: &[DuplicateName]) -> String {
    let mut out = String::new();
    for (i, duplicate) in duplicates.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = write!(
            out,
            "Package name \"{}\" used in multiple packages:",
            duplicate.name
        );
        for location in &duplicate.locations {
            let _ = write!(out, "\n\t{}", location.display());
        }
    }
    out
}

impl Error {
    /// Create an unresolvable specifier error.
    #[must_use]
    pub fn unresolvable(
        name: impl Into<String>,
        spec: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::UnresolvableSpecifier {
            name: name.into(),
            spec: spec.into(),
            reason: reason.into(),
        }
    }

    /// Short machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::DuplicatePackageName { .. } => "ENAME",
            Self::CyclesDetected { .. } => "ECYCLE",
            Self::UnresolvableSpecifier { .. } => "ESPEC",
            Self::UnsatisfiedWorkspaceSpec { .. } => "EWORKSPACE",
        }
    }
}
