//! Local package dependency graph for monorail.
//!
//! This crate builds a directed graph of the local dependencies between the
//! packages of a repository, collapses dependency cycles, extends package
//! subsets along local edges and plans dependency-ordered execution.
//!
//! # Key Types
//!
//! - [`PackageGraph`]: Packages keyed by name with resolved local edges
//! - [`ResolvedSpec`]: A parsed dependency specifier
//! - [`CycleSet`] / [`CyclicGraphNode`]: Collapsed dependency cycles
//! - [`QueryGraph`]: Incremental "what can run next" scheduling
//!
//! # Example
//!
//! ```ignore
//! use monorail_package_graph::{PackageGraph, batch_packages};
//! use monorail_workspace::{GraphType, Package};
//!
//! let packages = vec![
//!     Package::new("a", "1.0.0", "/repo/packages/a"),
//!     Package::new("b", "1.0.0", "/repo/packages/b").with_dependency("a", "^1.0.0"),
//! ];
//!
//! let graph = PackageGraph::new(&packages, GraphType::AllDependencies)?;
//! assert_eq!(graph.local_dependents("a").len(), 1);
//!
//! let batches = batch_packages(&packages, GraphType::AllDependencies, false)?;
//! assert_eq!(batches.len(), 2);
//! ```

#![warn(missing_docs)]

mod batch;
mod cycles;
mod error;
mod graph;
mod node;
mod query;
pub mod range;
pub mod spec;
mod traversal;

pub use batch::batch_packages;
pub use cycles::{
    CYCLES_DETECTED_MESSAGE, CyclePartition, CycleSet, CyclicGraphNode, Vertex, VertexRef,
    report_cycles,
};
pub use error::{DuplicateName, Error, Result};
pub use graph::{GraphOptions, PackageGraph};
pub use monorail_workspace::GraphType;
pub use node::{DependencyVertex, PackageGraphNode};
pub use petgraph::stable_graph::NodeIndex;
pub use query::{QueryGraph, QueryOptions};
pub use range::{VersionRange, satisfies};
pub use spec::{HostedRepo, ResolvedSpec, SpecKind, WorkspaceAlias, resolve};
