//! Cycle detection, collapsing and reporting.
//!
//! [`PackageGraph::collapse_cycles`] folds every set of packages that depend
//! on each other into a [`CyclicGraphNode`], so that packages plus collapsed
//! cycles form a DAG. Cycles discovered inside already collapsed cycles nest.
//! [`PackageGraph::partition_cycles`] only lists cycle paths and members.

use crate::error::{Error, Result};
use crate::graph::PackageGraph;
use crate::node::{DependencyVertex, PackageGraphNode};
use petgraph::stable_graph::NodeIndex;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, warn};

/// Header of every cycle report.
pub const CYCLES_DETECTED_MESSAGE: &str = "Dependency cycles detected, you should fix these!";

/// Handle to a vertex of a collapse: a package or a collapsed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VertexRef {
    /// A package node of the graph.
    Package(NodeIndex),
    /// A cycle in the owning [`CycleSet`].
    Cycle(usize),
}

/// A set of packages that depend on each other, treated as one vertex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CyclicGraphNode {
    name: String,
    members: Vec<(String, VertexRef)>,
    leaves: BTreeSet<NodeIndex>,
    local_dependencies: BTreeSet<NodeIndex>,
    local_dependents: BTreeSet<NodeIndex>,
}

impl CyclicGraphNode {
    fn new(id: usize) -> Self {
        Self {
            name: format!("(cycle) {id}"),
            members: Vec::new(),
            leaves: BTreeSet::new(),
            local_dependencies: BTreeSet::new(),
            local_dependents: BTreeSet::new(),
        }
    }

    /// Synthetic name, e.g. `(cycle) 1`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Direct members in insertion order. Members may be nested cycles.
    #[must_use]
    pub fn members(&self) -> &[(String, VertexRef)] {
        &self.members
    }

    /// Whether `name` is a direct member.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.members.iter().any(|(member, _)| member == name)
    }

    /// Whether the package at `index` is a member, however deeply nested.
    #[must_use]
    pub fn contains(&self, index: NodeIndex) -> bool {
        self.leaves.contains(&index)
    }

    /// Every package of the cycle, nested cycles expanded, in insertion order.
    #[must_use]
    pub fn flatten(&self, cycles: &CycleSet) -> Vec<NodeIndex> {
        let mut result = Vec::with_capacity(self.leaves.len());
        for (_, member) in &self.members {
            match *member {
                VertexRef::Package(idx) => result.push(idx),
                VertexRef::Cycle(id) => result.extend(cycles.cycle(id).flatten(cycles)),
            }
        }
        result
    }

    /// Packages outside the cycle that members depend on.
    #[must_use]
    pub const fn local_dependencies(&self) -> &BTreeSet<NodeIndex> {
        &self.local_dependencies
    }

    /// Packages outside the cycle that depend on members.
    #[must_use]
    pub const fn local_dependents(&self) -> &BTreeSet<NodeIndex> {
        &self.local_dependents
    }

    /// Forget every edge to the package at `index`.
    pub fn unlink(&mut self, index: NodeIndex) {
        self.local_dependencies.remove(&index);
        self.local_dependents.remove(&index);
    }

    /// Render the cycle starting from its discovery origin,
    /// e.g. `a -> b -> c -> a`.
    #[must_use]
    pub fn render(&self, cycles: &CycleSet) -> String {
        let mut parts: Vec<String> = self
            .members
            .iter()
            .map(|(name, member)| match *member {
                VertexRef::Package(_) => name.clone(),
                VertexRef::Cycle(id) => {
                    format!("(nested cycle: {})", cycles.cycle(id).render(cycles))
                }
            })
            .collect();
        if let Some(first) = parts.first().cloned() {
            parts.push(first);
        }
        parts.reverse();
        parts.join(" -> ")
    }

    /// Add a member, re-homing its outside edges onto the cycle and dropping
    /// edges that now point inside it.
    fn insert(
        &mut self,
        name: String,
        member: VertexRef,
        leaves: &[NodeIndex],
        dependencies: Vec<NodeIndex>,
        dependents: Vec<NodeIndex>,
    ) {
        self.members.push((name, member));
        for leaf in leaves {
            self.leaves.insert(*leaf);
            self.unlink(*leaf);
        }
        self.local_dependencies
            .extend(dependencies.into_iter().filter(|idx| !self.leaves.contains(idx)));
        self.local_dependents
            .extend(dependents.into_iter().filter(|idx| !self.leaves.contains(idx)));
    }
}

impl DependencyVertex for CyclicGraphNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_cycle(&self) -> bool {
        true
    }

    fn dependency_indices(&self, _graph: &PackageGraph) -> Vec<NodeIndex> {
        self.local_dependencies.iter().copied().collect()
    }

    fn dependent_indices(&self, _graph: &PackageGraph) -> Vec<NodeIndex> {
        self.local_dependents.iter().copied().collect()
    }
}

/// A borrowed vertex of a collapse.
#[derive(Debug, Clone, Copy)]
pub enum Vertex<'a> {
    /// A package node.
    Package(&'a PackageGraphNode),
    /// A collapsed cycle.
    Cycle(&'a CyclicGraphNode),
}

impl DependencyVertex for Vertex<'_> {
    fn name(&self) -> &str {
        match self {
            Self::Package(node) => DependencyVertex::name(*node),
            Self::Cycle(cycle) => cycle.name(),
        }
    }

    fn is_cycle(&self) -> bool {
        matches!(self, Self::Cycle(_))
    }

    fn dependency_indices(&self, graph: &PackageGraph) -> Vec<NodeIndex> {
        match self {
            Self::Package(node) => node.dependency_indices(graph),
            Self::Cycle(cycle) => cycle.dependency_indices(graph),
        }
    }

    fn dependent_indices(&self, graph: &PackageGraph) -> Vec<NodeIndex> {
        match self {
            Self::Package(node) => node.dependent_indices(graph),
            Self::Cycle(cycle) => cycle.dependent_indices(graph),
        }
    }
}

/// Result of [`PackageGraph::collapse_cycles`].
///
/// Holds every cycle created during the collapse, nested ones included, and
/// tracks which of them are still top-level.
#[derive(Debug, Clone, Default)]
pub struct CycleSet {
    arena: Vec<CyclicGraphNode>,
    top_level: Vec<usize>,
    paths: Vec<String>,
}

impl CycleSet {
    /// The cycle with arena id `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` did not come from this set.
    #[must_use]
    pub fn cycle(&self, id: usize) -> &CyclicGraphNode {
        &self.arena[id]
    }

    /// Ids of the top-level cycles, in discovery order.
    #[must_use]
    pub fn top_level(&self) -> &[usize] {
        &self.top_level
    }

    /// The top-level cycles, in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &CyclicGraphNode> + '_ {
        self.top_level.iter().map(move |&id| &self.arena[id])
    }

    /// Number of top-level cycles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.top_level.len()
    }

    /// Whether no cycle was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.top_level.is_empty()
    }

    /// Rendering of every cycle at the moment it was detected.
    #[must_use]
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Find the first top-level cycle with no outside dependency left, and
    /// detach it from the set.
    pub fn take_ready(&mut self) -> Option<usize> {
        let position = self
            .top_level
            .iter()
            .position(|&id| self.arena[id].local_dependencies.is_empty())?;
        Some(self.top_level.remove(position))
    }

    /// Unlink the package at `index` from every cycle.
    pub fn unlink(&mut self, index: NodeIndex) {
        for cycle in &mut self.arena {
            cycle.unlink(index);
        }
    }

    /// Borrow a vertex of this collapse.
    #[must_use]
    pub fn vertex<'a>(&'a self, graph: &'a PackageGraph, vertex: VertexRef) -> Option<Vertex<'a>> {
        match vertex {
            VertexRef::Package(idx) => graph.node(idx).map(Vertex::Package),
            VertexRef::Cycle(id) => self.arena.get(id).map(Vertex::Cycle),
        }
    }
}

/// Every cycle path and cycle member found by [`PackageGraph::partition_cycles`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CyclePartition {
    /// Each cycle as `origin -> ... -> origin`.
    pub paths: Vec<String>,
    /// Names of every package on a cycle, in graph order.
    pub members: Vec<String>,
}

impl CyclePartition {
    /// Whether no cycle was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Log detected cycles, or fail when `reject_cycles` is set.
///
/// # Errors
///
/// Returns [`Error::CyclesDetected`] if `paths` is non-empty and
/// `reject_cycles` is set.
pub fn report_cycles(paths: &[String], reject_cycles: bool) -> Result<()> {
    if paths.is_empty() {
        return Ok(());
    }

    if reject_cycles {
        return Err(Error::CyclesDetected {
            cycles: paths.to_vec(),
        });
    }

    warn!("{}\n{}", CYCLES_DETECTED_MESSAGE, paths.join("\n"));
    Ok(())
}

/// Mutable state of one collapse.
struct Collapser<'g> {
    graph: &'g PackageGraph,
    cycles: CycleSet,
    live: HashSet<usize>,
    node_to_cycle: HashMap<VertexRef, usize>,
    already_visited: HashSet<(VertexRef, VertexRef)>,
    walk_stack: Vec<VertexRef>,
}

impl<'g> Collapser<'g> {
    fn new(graph: &'g PackageGraph) -> Self {
        Self {
            graph,
            cycles: CycleSet::default(),
            live: HashSet::new(),
            node_to_cycle: HashMap::new(),
            already_visited: HashSet::new(),
            walk_stack: Vec::new(),
        }
    }

    fn run(mut self) -> CycleSet {
        let packages: Vec<NodeIndex> = self.graph.indices().collect();
        for idx in packages {
            self.visit_with_stack(VertexRef::Package(idx), VertexRef::Package(idx));
        }

        // Collapsed cycles may form larger cycles with each other. Cycles
        // created during this pass are walked too; absorbed ones are skipped.
        let mut position = 0;
        while position < self.cycles.top_level.len() {
            let id = self.cycles.top_level[position];
            if self.live.contains(&id) {
                self.visit_with_stack(VertexRef::Cycle(id), VertexRef::Cycle(id));
            }
            position += 1;
        }

        let live = self.live;
        self.cycles.top_level.retain(|id| live.contains(id));
        self.cycles
    }

    fn dependents_of(&self, vertex: VertexRef) -> Vec<NodeIndex> {
        self.cycles
            .vertex(self.graph, vertex)
            .map(|v| v.dependent_indices(self.graph))
            .unwrap_or_default()
    }

    fn visit_with_stack(&mut self, base: VertexRef, current: VertexRef) {
        self.walk_stack.push(current);
        for dependent in self.dependents_of(current) {
            self.visit(base, VertexRef::Package(dependent));
        }
        self.walk_stack.pop();
    }

    fn top_level_of(&self, vertex: VertexRef) -> VertexRef {
        let mut top = vertex;
        while let Some(&id) = self.node_to_cycle.get(&top) {
            top = VertexRef::Cycle(id);
        }
        top
    }

    fn visit(&mut self, base: VertexRef, dependent: VertexRef) {
        if self.node_to_cycle.contains_key(&base) {
            return;
        }

        let top = self.top_level_of(dependent);
        if !self.already_visited.insert((base, top)) {
            return;
        }

        let closes_cycle = top == base
            || match top {
                VertexRef::Cycle(id) => {
                    let base_name = self.vertex_name(base);
                    self.cycles.arena[id].has(&base_name)
                }
                VertexRef::Package(_) => false,
            };

        if closes_cycle {
            self.collapse_walk_stack();
            return;
        }

        if !self.walk_stack.contains(&top) {
            self.visit_with_stack(base, top);
        }
    }

    fn vertex_name(&self, vertex: VertexRef) -> String {
        self.cycles
            .vertex(self.graph, vertex)
            .map(|v| v.name().to_string())
            .unwrap_or_default()
    }

    fn collapse_walk_stack(&mut self) {
        let id = self.cycles.arena.len();
        let mut cycle = CyclicGraphNode::new(id + 1);

        for member in self.walk_stack.clone() {
            let (leaves, dependencies, dependents) = match member {
                VertexRef::Package(idx) => (
                    vec![idx],
                    self.graph.dependency_indices(idx),
                    self.graph.dependent_indices(idx),
                ),
                VertexRef::Cycle(inner) => {
                    let inner = &self.cycles.arena[inner];
                    (
                        inner.leaves.iter().copied().collect(),
                        inner.local_dependencies.iter().copied().collect(),
                        inner.local_dependents.iter().copied().collect(),
                    )
                }
            };

            let name = self.vertex_name(member);
            cycle.insert(name, member, &leaves, dependencies, dependents);
            self.node_to_cycle.insert(member, id);
            if let VertexRef::Cycle(inner) = member {
                self.live.remove(&inner);
            }
        }

        self.cycles.arena.push(cycle);
        self.cycles.top_level.push(id);
        self.live.insert(id);

        let path = self.cycles.arena[id].render(&self.cycles);
        debug!(cycle = %self.cycles.arena[id].name, %path, "Collapsed cycle");
        self.cycles.paths.push(path);
    }
}

impl PackageGraph {
    /// Collapse every dependency cycle into a [`CyclicGraphNode`].
    ///
    /// Every detected cycle is reported through [`report_cycles`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::CyclesDetected`] if cycles exist and `reject_cycles`
    /// is set.
    pub fn collapse_cycles(&self, reject_cycles: bool) -> Result<CycleSet> {
        let cycles = Collapser::new(self).run();
        report_cycles(cycles.paths(), reject_cycles)?;
        Ok(cycles)
    }

    /// List every cycle path and every package on a cycle without collapsing.
    ///
    /// Each package is walked along its dependents; reaching the package
    /// again records the walked path. A two-package cycle therefore yields
    /// one path per member.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CyclesDetected`] if cycles exist and `reject_cycles`
    /// is set.
    pub fn partition_cycles(&self, reject_cycles: bool) -> Result<CyclePartition> {
        let mut paths: Vec<String> = Vec::new();
        let mut members: BTreeSet<NodeIndex> = BTreeSet::new();

        for origin in self.indices() {
            let mut seen: HashSet<NodeIndex> = HashSet::new();
            let mut walk = vec![origin];
            self.walk_partition(origin, origin, &mut walk, &mut seen, &mut |path| {
                let rendered = path
                    .iter()
                    .filter_map(|&idx| self.node(idx).map(PackageGraphNode::name))
                    .collect::<Vec<_>>()
                    .join(" -> ");
                if !paths.contains(&rendered) {
                    paths.push(rendered);
                }
                members.extend(path.iter().copied());
            });
        }

        report_cycles(&paths, reject_cycles)?;

        Ok(CyclePartition {
            paths,
            members: members
                .into_iter()
                .filter_map(|idx| self.node(idx).map(|node| node.name().to_string()))
                .collect(),
        })
    }

    fn walk_partition(
        &self,
        origin: NodeIndex,
        current: NodeIndex,
        walk: &mut Vec<NodeIndex>,
        seen: &mut HashSet<NodeIndex>,
        on_cycle: &mut dyn FnMut(&[NodeIndex]),
    ) {
        for dependent in self.dependent_indices(current) {
            if !seen.insert(dependent) {
                continue;
            }
            walk.push(dependent);
            if dependent == origin {
                on_cycle(walk);
            } else {
                self.walk_partition(origin, dependent, walk, seen, on_cycle);
            }
            walk.pop();
        }
    }
}
