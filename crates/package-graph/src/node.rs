//! Graph vertices: package nodes and the vertex abstraction shared with
//! collapsed cycles.

use crate::graph::PackageGraph;
use crate::range::{parse_version, satisfies};
use crate::spec::ResolvedSpec;
use monorail_workspace::Package;
use petgraph::stable_graph::NodeIndex;
use std::collections::BTreeMap;
use std::path::Path;

/// One package inside a [`PackageGraph`].
///
/// Local edges live in the owning graph, not in the node; use
/// [`PackageGraph::local_dependencies`] and [`PackageGraph::local_dependents`]
/// to walk them.
#[derive(Debug, Clone)]
pub struct PackageGraphNode {
    pub(crate) index: NodeIndex,
    pub(crate) package: Package,
    pub(crate) external_dependencies: BTreeMap<String, ResolvedSpec>,
}

impl PackageGraphNode {
    pub(crate) fn new(package: Package) -> Self {
        Self {
            index: NodeIndex::end(),
            package,
            external_dependencies: BTreeMap::new(),
        }
    }

    /// Package name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.package.name
    }

    /// Package version, if declared.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.package.version.as_deref()
    }

    /// Directory holding the package manifest.
    #[must_use]
    pub fn location(&self) -> &Path {
        &self.package.location
    }

    /// The underlying package.
    #[must_use]
    pub const fn package(&self) -> &Package {
        &self.package
    }

    /// Stable index of this node in its graph.
    #[must_use]
    pub const fn index(&self) -> NodeIndex {
        self.index
    }

    /// Dependencies that did not resolve to a sibling package.
    #[must_use]
    pub const fn external_dependencies(&self) -> &BTreeMap<String, ResolvedSpec> {
        &self.external_dependencies
    }

    /// The first prerelease identifier of the version, e.g. `beta` for
    /// `1.0.0-beta.1`.
    #[must_use]
    pub fn prerelease_id(&self) -> Option<String> {
        let version = parse_version(self.version()?)?;
        version
            .pre
            .as_str()
            .split('.')
            .next()
            .filter(|id| !id.is_empty())
            .map(str::to_string)
    }

    /// Whether this package's version satisfies `spec`.
    ///
    /// Git references are tested by committish first, then by `semver:`
    /// range; everything else by its fetch spec.
    #[must_use]
    pub fn satisfies(&self, spec: &ResolvedSpec) -> bool {
        self.version()
            .is_some_and(|version| satisfies(version, spec.version_target()))
    }
}

/// Anything the dependency walks can step through: a package or a collapsed
/// cycle of packages.
///
/// Edges are reported as package indices of the owning graph. A collapsed
/// cycle reports the edges of its members that leave the cycle.
pub trait DependencyVertex {
    /// Display name.
    fn name(&self) -> &str;

    /// Whether this vertex is a collapsed cycle.
    fn is_cycle(&self) -> bool;

    /// Packages this vertex depends on locally.
    fn dependency_indices(&self, graph: &PackageGraph) -> Vec<NodeIndex>;

    /// Packages depending locally on this vertex.
    fn dependent_indices(&self, graph: &PackageGraph) -> Vec<NodeIndex>;
}

impl DependencyVertex for PackageGraphNode {
    fn name(&self) -> &str {
        &self.package.name
    }

    fn is_cycle(&self) -> bool {
        false
    }

    fn dependency_indices(&self, graph: &PackageGraph) -> Vec<NodeIndex> {
        graph.dependency_indices(self.index)
    }

    fn dependent_indices(&self, graph: &PackageGraph) -> Vec<NodeIndex> {
        graph.dependent_indices(self.index)
    }
}
