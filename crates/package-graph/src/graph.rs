//! The local package dependency graph.
//!
//! Nodes are packages; an edge `a -> b` means "b depends on a" and carries
//! the specifier `b` declared for `a`. A node's local dependencies are its
//! incoming edges and its local dependents its outgoing edges, so the two
//! views can never disagree.

use crate::error::{DuplicateName, Error, Result};
use crate::node::PackageGraphNode;
use crate::spec::{ResolvedSpec, normalize_path, resolve};
use monorail_workspace::{DependencyMap, GraphConfig, GraphType, Package};
use petgraph::Direction;
use petgraph::algo::tarjan_scc;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use tracing::{debug, trace, warn};

/// Options controlling which edges a graph contains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphOptions {
    /// Dependency maps used for edges.
    pub graph_type: GraphType,
    /// Link every sibling reference locally, ignoring version satisfaction.
    pub force_local: bool,
}

impl GraphOptions {
    /// Options for the given graph type without forced local links.
    #[must_use]
    pub const fn new(graph_type: GraphType) -> Self {
        Self {
            graph_type,
            force_local: false,
        }
    }

    /// Set forced local linking.
    #[must_use]
    pub const fn with_force_local(mut self, force_local: bool) -> Self {
        self.force_local = force_local;
        self
    }
}

impl From<&GraphConfig> for GraphOptions {
    fn from(config: &GraphConfig) -> Self {
        Self {
            graph_type: config.graph_type,
            force_local: config.force_local,
        }
    }
}

/// Graph of the local dependency relationships between packages.
#[derive(Debug, Clone)]
pub struct PackageGraph {
    graph: StableDiGraph<PackageGraphNode, ResolvedSpec>,
    name_to_node: HashMap<String, NodeIndex>,
}

impl PackageGraph {
    /// Build a graph from `packages` without forced local links.
    ///
    /// # Errors
    ///
    /// See [`PackageGraph::with_options`].
    pub fn new(packages: &[Package], graph_type: GraphType) -> Result<Self> {
        Self::with_options(packages, &GraphOptions::new(graph_type))
    }

    /// Build a graph from `packages`.
    ///
    /// Every dependency naming a sibling package becomes a local edge when the
    /// sibling satisfies it (or it points at the sibling's directory, or
    /// `force_local` is set); everything else is recorded as an external
    /// dependency of the node.
    ///
    /// # Errors
    ///
    /// - [`Error::DuplicatePackageName`] if two packages share a name
    /// - [`Error::UnresolvableSpecifier`] if a specifier cannot be parsed
    /// - [`Error::UnsatisfiedWorkspaceSpec`] if a `workspace:` specifier does
    ///   not match its sibling
    pub fn with_options(packages: &[Package], options: &GraphOptions) -> Result<Self> {
        check_unique_names(packages)?;

        let mut graph = StableDiGraph::with_capacity(packages.len(), 0);
        let mut name_to_node = HashMap::with_capacity(packages.len());

        for package in packages {
            let index = graph.add_node(PackageGraphNode::new(package.clone()));
            graph[index].index = index;
            name_to_node.insert(package.name.clone(), index);
        }

        let mut this = Self {
            graph,
            name_to_node,
        };
        this.link(options)?;

        debug!(
            packages = this.len(),
            edges = this.graph.edge_count(),
            graph_type = %options.graph_type,
            force_local = options.force_local,
            "Built package graph"
        );
        Ok(this)
    }

    fn link(&mut self, options: &GraphOptions) -> Result<()> {
        let indices: Vec<NodeIndex> = self.graph.node_indices().collect();

        for current in indices {
            let package = &self.graph[current].package;
            let current_name = package.name.clone();
            let location = package.location.clone();
            let dependencies = graph_dependencies(package, options.graph_type);

            for (dep_name, raw_spec) in dependencies {
                if dep_name == current_name {
                    warn!(package = %current_name, spec = %raw_spec, "Ignoring dependency on itself");
                    continue;
                }

                let sibling = self.name_to_node.get(&dep_name).copied();
                let sibling_version = sibling.and_then(|idx| self.graph[idx].version());
                let resolved = resolve(&dep_name, &raw_spec, &location, sibling_version)?;

                let Some(sibling) = sibling else {
                    trace!(package = %current_name, dependency = %resolved, "External dependency");
                    self.graph[current]
                        .external_dependencies
                        .insert(dep_name, resolved);
                    continue;
                };

                let sibling_node = &self.graph[sibling];
                let sibling_location = normalize_path(sibling_node.location());
                let is_local = options.force_local
                    || PathBuf::from(&resolved.fetch_spec) == sibling_location
                    || sibling_node.satisfies(&resolved);

                if is_local {
                    trace!(package = %current_name, dependency = %resolved, "Local dependency");
                    self.graph.add_edge(sibling, current, resolved);
                } else if resolved.is_workspace() {
                    return Err(Error::UnsatisfiedWorkspaceSpec {
                        name: dep_name,
                        spec: resolved.fetch_spec,
                    });
                } else {
                    debug!(
                        package = %current_name,
                        dependency = %resolved,
                        sibling_version = sibling_node.version().unwrap_or("<none>"),
                        "Sibling does not satisfy specifier, treating as external"
                    );
                    self.graph[current]
                        .external_dependencies
                        .insert(dep_name, resolved);
                }
            }
        }

        Ok(())
    }

    /// Number of packages in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Whether the graph has no packages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Whether a package named `name` is in the graph.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.name_to_node.contains_key(name)
    }

    /// Look up a node by package name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PackageGraphNode> {
        self.name_to_node
            .get(name)
            .and_then(|&idx| self.graph.node_weight(idx))
    }

    /// Look up a node by index.
    #[must_use]
    pub fn node(&self, index: NodeIndex) -> Option<&PackageGraphNode> {
        self.graph.node_weight(index)
    }

    /// Nodes in the order their packages were given.
    pub fn iter(&self) -> impl Iterator<Item = &PackageGraphNode> + '_ {
        self.graph.node_indices().map(move |idx| &self.graph[idx])
    }

    /// Node indices in graph order.
    pub fn indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    /// The packages of every remaining node, in graph order.
    #[must_use]
    pub fn raw_package_list(&self) -> Vec<&Package> {
        self.iter().map(PackageGraphNode::package).collect()
    }

    /// Local dependencies of `name` with the specifier `name` declared for each.
    ///
    /// Unknown names have no dependencies.
    #[must_use]
    pub fn local_dependencies(&self, name: &str) -> Vec<(&PackageGraphNode, &ResolvedSpec)> {
        self.neighbors(name, Direction::Incoming)
    }

    /// Local dependents of `name` with the specifier each dependent declared.
    ///
    /// Unknown names have no dependents.
    #[must_use]
    pub fn local_dependents(&self, name: &str) -> Vec<(&PackageGraphNode, &ResolvedSpec)> {
        self.neighbors(name, Direction::Outgoing)
    }

    fn neighbors(
        &self,
        name: &str,
        direction: Direction,
    ) -> Vec<(&PackageGraphNode, &ResolvedSpec)> {
        let Some(&idx) = self.name_to_node.get(name) else {
            return Vec::new();
        };

        let mut edges: Vec<_> = self
            .graph
            .edges_directed(idx, direction)
            .map(|edge| {
                let other = match direction {
                    Direction::Incoming => edge.source(),
                    Direction::Outgoing => edge.target(),
                };
                (other, edge.weight())
            })
            .collect();
        edges.sort_by_key(|(other, _)| *other);
        edges
            .into_iter()
            .map(|(other, spec)| (&self.graph[other], spec))
            .collect()
    }

    /// Indices of the packages `index` depends on, in graph order.
    #[must_use]
    pub fn dependency_indices(&self, index: NodeIndex) -> Vec<NodeIndex> {
        self.sorted_neighbors(index, Direction::Incoming)
    }

    /// Indices of the packages depending on `index`, in graph order.
    #[must_use]
    pub fn dependent_indices(&self, index: NodeIndex) -> Vec<NodeIndex> {
        self.sorted_neighbors(index, Direction::Outgoing)
    }

    fn sorted_neighbors(&self, index: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
        if !self.graph.contains_node(index) {
            return Vec::new();
        }
        let mut neighbors: Vec<NodeIndex> = self.graph.neighbors_directed(index, direction).collect();
        neighbors.sort_unstable();
        neighbors.dedup();
        neighbors
    }

    /// Number of local dependencies of the node at `index`.
    #[must_use]
    pub fn dependency_count(&self, index: NodeIndex) -> usize {
        self.graph
            .neighbors_directed(index, Direction::Incoming)
            .count()
    }

    /// Number of local dependents of the node at `index`.
    #[must_use]
    pub fn dependent_count(&self, index: NodeIndex) -> usize {
        self.graph
            .neighbors_directed(index, Direction::Outgoing)
            .count()
    }

    /// Strongly connected components of the remaining graph.
    #[must_use]
    pub fn strongly_connected_components(&self) -> Vec<Vec<NodeIndex>> {
        tarjan_scc(&self.graph)
    }

    /// Index of the node named `name`.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<NodeIndex> {
        self.name_to_node.get(name).copied()
    }

    /// Remove a package and every edge touching it.
    pub fn remove(&mut self, name: &str) -> Option<PackageGraphNode> {
        let idx = self.name_to_node.remove(name)?;
        self.graph.remove_node(idx)
    }

    /// Remove the node at `index` and every edge touching it.
    pub fn remove_index(&mut self, index: NodeIndex) -> Option<PackageGraphNode> {
        let node = self.graph.remove_node(index)?;
        self.name_to_node.remove(node.name());
        Some(node)
    }

    /// Remove a batch of packages. Removing every package clears the graph
    /// in one step.
    pub fn prune<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let indices: Vec<NodeIndex> = names
            .into_iter()
            .filter_map(|name| self.index_of(name.as_ref()))
            .collect();
        self.prune_indices(&indices);
    }

    /// Remove a batch of nodes by index.
    pub fn prune_indices(&mut self, indices: &[NodeIndex]) {
        let mut unique = indices.to_vec();
        unique.retain(|idx| self.graph.contains_node(*idx));
        unique.sort_unstable();
        unique.dedup();

        if unique.len() == self.len() {
            self.graph.clear();
            self.name_to_node.clear();
            return;
        }

        for idx in unique {
            self.remove_index(idx);
        }
    }
}

/// Merge the dependency maps that take part in a graph of `graph_type`.
///
/// Later maps win: `optionalDependencies` override `devDependencies`, and
/// `dependencies` override both. Peer dependencies never form edges.
fn graph_dependencies(package: &Package, graph_type: GraphType) -> DependencyMap {
    let mut merged = BTreeMap::new();
    if graph_type.includes_dev() {
        merged.extend(package.dev_dependencies.clone());
    }
    merged.extend(package.optional_dependencies.clone());
    merged.extend(package.dependencies.clone());
    merged
}

fn check_unique_names(packages: &[Package]) -> Result<()> {
    let mut by_name: Vec<DuplicateName> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::with_capacity(packages.len());

    for package in packages {
        match positions.get(package.name.as_str()) {
            Some(&pos) => by_name[pos].locations.push(package.location.clone()),
            None => {
                positions.insert(&package.name, by_name.len());
                by_name.push(DuplicateName {
                    name: package.name.clone(),
                    locations: vec![package.location.clone()],
                });
            }
        }
    }

    if by_name.len() == packages.len() {
        return Ok(());
    }

    let duplicates: Vec<DuplicateName> = by_name
        .into_iter()
        .filter(|entry| entry.locations.len() > 1)
        .collect();
    Err(Error::DuplicatePackageName { duplicates })
}
