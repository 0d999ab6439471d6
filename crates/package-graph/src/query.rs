//! Incremental dependency-ordered scheduling over a graph with collapsed cycles.

use crate::cycles::CycleSet;
use crate::error::Result;
use crate::graph::{GraphOptions, PackageGraph};
use monorail_workspace::{GraphType, Package};
use petgraph::stable_graph::NodeIndex;
use std::collections::HashSet;
use tracing::debug;

/// Options for [`QueryGraph`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Dependency maps used for edges.
    pub graph_type: GraphType,
    /// Link every sibling reference locally.
    pub force_local: bool,
    /// Fail instead of warning when cycles exist.
    pub reject_cycles: bool,
}

/// Hands out packages whose local dependencies have all finished.
///
/// Callers poll [`available_packages`](Self::available_packages), start the
/// returned packages, [`mark_as_taken`](Self::mark_as_taken) them while they
/// run, and [`mark_as_done`](Self::mark_as_done) them once finished.
#[derive(Debug, Clone)]
pub struct QueryGraph {
    graph: PackageGraph,
    cycles: CycleSet,
    taken: HashSet<NodeIndex>,
}

impl QueryGraph {
    /// Build the graph for `packages` and collapse its cycles.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph cannot be built, or if cycles exist and
    /// `reject_cycles` is set.
    pub fn new(packages: &[Package], options: &QueryOptions) -> Result<Self> {
        let graph = PackageGraph::with_options(
            packages,
            &GraphOptions::new(options.graph_type).with_force_local(options.force_local),
        )?;
        let cycles = graph.collapse_cycles(options.reject_cycles)?;
        Ok(Self {
            graph,
            cycles,
            taken: HashSet::new(),
        })
    }

    /// Packages that can start now.
    ///
    /// These are the untaken packages without unfinished local dependencies.
    /// When there are none, the members of the first cycle that no longer
    /// waits on anything outside itself are released together.
    pub fn available_packages(&mut self) -> Vec<Package> {
        let leaves: Vec<NodeIndex> = self
            .graph
            .indices()
            .filter(|idx| !self.taken.contains(idx) && self.graph.dependency_count(*idx) == 0)
            .collect();

        if !leaves.is_empty() {
            return self.packages(&leaves);
        }

        let Some(id) = self.cycles.take_ready() else {
            return Vec::new();
        };
        let members: Vec<NodeIndex> = self
            .cycles
            .cycle(id)
            .flatten(&self.cycles)
            .into_iter()
            .filter(|idx| !self.taken.contains(idx))
            .collect();
        debug!(cycle = %self.cycles.cycle(id).name(), count = members.len(), "Releasing cycle");
        self.packages(&members)
    }

    /// Hide a package from [`available_packages`](Self::available_packages)
    /// without finishing it.
    pub fn mark_as_taken(&mut self, name: &str) {
        if let Some(idx) = self.graph.index_of(name) {
            self.taken.insert(idx);
        }
    }

    /// Finish a package, releasing whatever waited on it.
    pub fn mark_as_done(&mut self, name: &str) {
        if let Some(idx) = self.graph.index_of(name) {
            self.graph.remove_index(idx);
            self.cycles.unlink(idx);
            self.taken.remove(&idx);
        }
    }

    /// Number of unfinished packages.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.graph.len()
    }

    /// Every package in an order where dependencies come first, with each
    /// cycle's members kept together.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph cannot be built, or if cycles exist and
    /// `reject_cycles` is set.
    pub fn toposort(packages: &[Package], options: &QueryOptions) -> Result<Vec<Package>> {
        let mut query = Self::new(packages, options)?;
        let mut result = Vec::with_capacity(packages.len());

        loop {
            let batch = query.available_packages();
            if batch.is_empty() {
                break;
            }
            for package in &batch {
                query.mark_as_done(&package.name);
            }
            result.extend(batch);
        }

        Ok(result)
    }

    fn packages(&self, indices: &[NodeIndex]) -> Vec<Package> {
        indices
            .iter()
            .filter_map(|&idx| self.graph.node(idx).map(|node| node.package().clone()))
            .collect()
    }
}
