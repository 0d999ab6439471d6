//! Transitive closure of a package subset along local edges.

use crate::graph::PackageGraph;
use monorail_workspace::Package;
use petgraph::stable_graph::NodeIndex;
use std::collections::{HashSet, VecDeque};

/// Which local edges a closure follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edges {
    Dependencies,
    Dependents,
}

impl PackageGraph {
    /// Extend `names` with every package they transitively depend on.
    ///
    /// The result starts with the given packages and continues in
    /// breadth-first discovery order. Names not in the graph are ignored.
    pub fn add_dependencies<I, S>(&self, names: I) -> Vec<&Package>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extend_list(names, Edges::Dependencies)
    }

    /// Extend `names` with every package that transitively depends on them.
    ///
    /// The result starts with the given packages and continues in
    /// breadth-first discovery order. Names not in the graph are ignored.
    pub fn add_dependents<I, S>(&self, names: I) -> Vec<&Package>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extend_list(names, Edges::Dependents)
    }

    fn extend_list<I, S>(&self, names: I, edges: Edges) -> Vec<&Package>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut queue: VecDeque<NodeIndex> = VecDeque::new();
        let mut visited: HashSet<NodeIndex> = HashSet::new();

        for name in names {
            if let Some(idx) = self.index_of(name.as_ref())
                && visited.insert(idx)
            {
                queue.push_back(idx);
            }
        }

        let mut result = Vec::with_capacity(queue.len());
        while let Some(current) = queue.pop_front() {
            let Some(node) = self.node(current) else {
                continue;
            };
            result.push(node.package());

            let neighbors = match edges {
                Edges::Dependencies => self.dependency_indices(current),
                Edges::Dependents => self.dependent_indices(current),
            };
            for next in neighbors {
                if next != current && visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        result
    }
}
