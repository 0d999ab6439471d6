//! Property-based tests for package graph invariants.
//!
//! These tests verify the behavioral contracts of the package graph:
//! - Local dependency and dependent edges always mirror each other
//! - No package is ever its own local dependency
//! - Transitive closures are idempotent
//! - Batches and topological orders respect every edge outside a cycle
//! - Collapsing folds each strongly connected component into one cycle

use monorail_package_graph::{
    GraphType, NodeIndex, PackageGraph, QueryGraph, QueryOptions, batch_packages,
};
use monorail_workspace::Package;
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap, HashSet};

// =============================================================================
// Strategies for generating test data
// =============================================================================

/// Generate packages where each one may depend on any other, cycles included.
///
/// Each entry lists the indices of the packages it depends on.
fn any_graph_strategy(max_packages: usize) -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1..=max_packages).prop_flat_map(|count| {
        proptest::collection::vec(proptest::collection::vec(0..count, 0..=3), count)
    })
}

/// Generate packages that only depend on packages listed before them.
fn dag_strategy(max_packages: usize) -> impl Strategy<Value = Vec<Vec<usize>>> {
    any_graph_strategy(max_packages).prop_map(|deps| {
        deps.into_iter()
            .enumerate()
            .map(|(i, deps)| deps.into_iter().filter(|&d| d < i).collect())
            .collect()
    })
}

// =============================================================================
// Helper Functions
// =============================================================================

fn name(i: usize) -> String {
    format!("pkg-{i}")
}

/// Build packages; dependency specifiers always match the sibling version.
/// Self references are kept on purpose.
fn build_packages(deps: &[Vec<usize>]) -> Vec<Package> {
    deps.iter()
        .enumerate()
        .map(|(i, deps)| {
            deps.iter().fold(
                Package::new(name(i), "1.0.0", format!("/repo/packages/{i}")),
                |package, &d| package.with_dependency(name(d), "^1.0.0"),
            )
        })
        .collect()
}

fn build_graph(packages: &[Package]) -> PackageGraph {
    PackageGraph::new(packages, GraphType::AllDependencies).expect("graph should build")
}

fn edges(deps: &[Vec<usize>]) -> BTreeSet<(String, String)> {
    deps.iter()
        .enumerate()
        .flat_map(|(i, deps)| {
            deps.iter()
                .filter(move |&&d| d != i)
                .map(move |&d| (name(i), name(d)))
        })
        .collect()
}

fn assert_symmetric(graph: &PackageGraph) -> Result<(), TestCaseError> {
    for node in graph.iter() {
        for (dependency, _) in graph.local_dependencies(node.name()) {
            prop_assert!(
                graph
                    .local_dependents(dependency.name())
                    .iter()
                    .any(|(dependent, _)| dependent.name() == node.name()),
                "'{}' depends on '{}' but is not among its dependents",
                node.name(),
                dependency.name()
            );
        }
        for (dependent, _) in graph.local_dependents(node.name()) {
            prop_assert!(
                graph
                    .local_dependencies(dependent.name())
                    .iter()
                    .any(|(dependency, _)| dependency.name() == node.name()),
                "'{}' is a dependent of '{}' but does not depend on it",
                dependent.name(),
                node.name()
            );
        }
    }
    Ok(())
}

/// Map each package name to the id of its strongly connected component.
fn component_of(graph: &PackageGraph) -> HashMap<String, usize> {
    graph
        .strongly_connected_components()
        .into_iter()
        .enumerate()
        .flat_map(|(id, component)| {
            component
                .into_iter()
                .filter_map(|idx| graph.node(idx).map(|n| n.name().to_string()))
                .map(move |name| (name, id))
                .collect::<Vec<_>>()
        })
        .collect()
}

// =============================================================================
// Property Tests: Construction
// =============================================================================

proptest! {
    /// Contract: every local edge is recorded on both ends, and no package is
    /// its own dependency.
    #[test]
    fn edges_are_symmetric_without_self_edges(deps in any_graph_strategy(12)) {
        let packages = build_packages(&deps);
        let graph = build_graph(&packages);

        assert_symmetric(&graph)?;

        let expected = edges(&deps);
        let mut actual = BTreeSet::new();
        for node in graph.iter() {
            for (dependency, _) in graph.local_dependencies(node.name()) {
                prop_assert_ne!(dependency.name(), node.name());
                actual.insert((node.name().to_string(), dependency.name().to_string()));
            }
        }
        prop_assert_eq!(actual, expected);
    }

    /// Contract: pruning keeps edges symmetric and drops every edge to the
    /// pruned packages.
    #[test]
    fn prune_preserves_symmetry(
        deps in any_graph_strategy(12),
        picks in proptest::collection::vec(0..12_usize, 0..6)
    ) {
        let packages = build_packages(&deps);
        let mut graph = build_graph(&packages);
        let pruned: Vec<String> = picks.into_iter().map(name).collect();

        graph.prune(&pruned);
        assert_symmetric(&graph)?;

        for node in graph.iter() {
            prop_assert!(!pruned.contains(&node.name().to_string()));
            for (dependency, _) in graph.local_dependencies(node.name()) {
                prop_assert!(!pruned.contains(&dependency.name().to_string()));
            }
        }
    }

    /// Contract: extending a subset is a closure operation.
    #[test]
    fn closures_are_idempotent(
        deps in any_graph_strategy(12),
        seeds in proptest::collection::vec(0..12_usize, 0..4)
    ) {
        let packages = build_packages(&deps);
        let graph = build_graph(&packages);
        let seeds: Vec<String> = seeds.into_iter().map(name).collect();

        let once: Vec<String> = graph.add_dependencies(&seeds).iter().map(|p| p.name.clone()).collect();
        let twice: Vec<String> = graph.add_dependencies(&once).iter().map(|p| p.name.clone()).collect();
        prop_assert_eq!(&once, &twice);

        let once: Vec<String> = graph.add_dependents(&seeds).iter().map(|p| p.name.clone()).collect();
        let twice: Vec<String> = graph.add_dependents(&once).iter().map(|p| p.name.clone()).collect();
        prop_assert_eq!(&once, &twice);

        let unique: HashSet<&String> = once.iter().collect();
        prop_assert_eq!(unique.len(), once.len(), "closure must not repeat packages");
    }
}

// =============================================================================
// Property Tests: Ordering
// =============================================================================

proptest! {
    /// Contract: in a DAG every dependency lands in a strictly earlier batch.
    #[test]
    fn dag_batches_respect_dependencies(deps in dag_strategy(15)) {
        let packages = build_packages(&deps);
        let batches = batch_packages(&packages, GraphType::AllDependencies, true)
            .expect("DAG batches should succeed even when rejecting cycles");

        let mut batch_of: HashMap<String, usize> = HashMap::new();
        for (i, batch) in batches.iter().enumerate() {
            for package in batch {
                prop_assert!(batch_of.insert(package.name.clone(), i).is_none());
            }
        }
        prop_assert_eq!(batch_of.len(), packages.len());

        for (dependent, dependency) in edges(&deps) {
            prop_assert!(batch_of[&dependency] < batch_of[&dependent]);
        }
    }

    /// Contract: with cycles present, every package is batched exactly once
    /// and every edge between different cycles or packages points backwards.
    #[test]
    fn cyclic_batches_respect_edges_outside_cycles(deps in any_graph_strategy(12)) {
        let packages = build_packages(&deps);
        let components = component_of(&build_graph(&packages));
        let batches = batch_packages(&packages, GraphType::AllDependencies, false)
            .expect("batching should succeed without rejecting cycles");

        let mut batch_of: HashMap<String, usize> = HashMap::new();
        for (i, batch) in batches.iter().enumerate() {
            prop_assert!(!batch.is_empty());
            for package in batch {
                prop_assert!(batch_of.insert(package.name.clone(), i).is_none());
            }
        }
        prop_assert_eq!(batch_of.len(), packages.len());

        for (dependent, dependency) in edges(&deps) {
            if components[&dependent] != components[&dependency] {
                prop_assert!(batch_of[&dependency] < batch_of[&dependent]);
            }
        }
    }

    /// Contract: batching is deterministic.
    #[test]
    fn batches_are_deterministic(deps in any_graph_strategy(12)) {
        let packages = build_packages(&deps);
        let first = batch_packages(&packages, GraphType::AllDependencies, false).unwrap();
        let second = batch_packages(&packages, GraphType::AllDependencies, false).unwrap();
        prop_assert_eq!(first, second);
    }

    /// Contract: the topological order contains every package once and
    /// respects every edge outside a cycle.
    #[test]
    fn toposort_respects_edges_outside_cycles(deps in any_graph_strategy(12)) {
        let packages = build_packages(&deps);
        let components = component_of(&build_graph(&packages));
        let sorted = QueryGraph::toposort(&packages, &QueryOptions::default()).unwrap();

        let position: HashMap<String, usize> = sorted
            .iter()
            .enumerate()
            .map(|(i, p)| (p.name.clone(), i))
            .collect();
        prop_assert_eq!(position.len(), packages.len());
        prop_assert_eq!(sorted.len(), packages.len());

        for (dependent, dependency) in edges(&deps) {
            if components[&dependent] != components[&dependency] {
                prop_assert!(position[&dependency] < position[&dependent]);
            }
        }
    }
}

// =============================================================================
// Property Tests: Cycles
// =============================================================================

proptest! {
    /// Contract: each strongly connected component with more than one package
    /// becomes exactly one top-level cycle, and nothing else is collapsed.
    #[test]
    fn collapse_matches_strongly_connected_components(deps in any_graph_strategy(10)) {
        let packages = build_packages(&deps);
        let graph = build_graph(&packages);
        let cycles = graph.collapse_cycles(false).unwrap();

        let expected: BTreeSet<BTreeSet<NodeIndex>> = graph
            .strongly_connected_components()
            .into_iter()
            .filter(|component| component.len() > 1)
            .map(|component| component.into_iter().collect())
            .collect();

        let actual: BTreeSet<BTreeSet<NodeIndex>> = cycles
            .iter()
            .map(|cycle| cycle.flatten(&cycles).into_iter().collect())
            .collect();

        prop_assert_eq!(actual, expected);
        prop_assert_eq!(cycles.paths().is_empty(), cycles.is_empty());
    }

    /// Contract: partitioning finds exactly the packages on some cycle.
    #[test]
    fn partition_members_are_cycle_packages(deps in any_graph_strategy(10)) {
        let packages = build_packages(&deps);
        let graph = build_graph(&packages);
        let partition = graph.partition_cycles(false).unwrap();

        let expected: BTreeSet<String> = graph
            .strongly_connected_components()
            .into_iter()
            .filter(|component| component.len() > 1)
            .flatten()
            .filter_map(|idx| graph.node(idx).map(|n| n.name().to_string()))
            .collect();
        let actual: BTreeSet<String> = partition.members.iter().cloned().collect();

        prop_assert_eq!(actual, expected);
        prop_assert_eq!(partition.paths.is_empty(), partition.members.is_empty());
    }

    /// Contract: rejecting cycles fails exactly when a cycle exists.
    #[test]
    fn reject_cycles_fails_only_on_cycles(deps in any_graph_strategy(10)) {
        let packages = build_packages(&deps);
        let graph = build_graph(&packages);
        let has_cycle = graph
            .strongly_connected_components()
            .iter()
            .any(|component| component.len() > 1);

        let result = graph.collapse_cycles(true);
        prop_assert_eq!(result.is_err(), has_cycle);
        if let Err(err) = result {
            prop_assert_eq!(err.code(), "ECYCLE");
        }
    }
}
