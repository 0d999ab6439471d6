//! Parallel execution batches.

use crate::error::Result;
use crate::graph::{GraphOptions, PackageGraph};
use monorail_workspace::{GraphType, Package};
use petgraph::stable_graph::NodeIndex;
use std::cmp::Reverse;
use tracing::debug;

/// Split `packages` into batches that can each run in parallel.
///
/// Every package comes after all of its local dependencies unless both sit on
/// the same cycle. When only cycles remain, the first cycle that depends on
/// nothing outside itself is isolated: its member with the most dependents
/// (the "king") forms a batch of its own and the remaining members follow in
/// the next batch. Batching then resumes with whatever depended on the cycle.
///
/// # Errors
///
/// Returns an error if the graph cannot be built, or if cycles exist and
/// `reject_cycles` is set.
pub fn batch_packages(
    packages: &[Package],
    graph_type: GraphType,
    reject_cycles: bool,
) -> Result<Vec<Vec<Package>>> {
    let mut graph = PackageGraph::with_options(packages, &GraphOptions::new(graph_type))?;
    let partition = graph.partition_cycles(reject_cycles)?;
    debug!(members = ?partition.members, "Cycle members");

    let mut batches: Vec<Vec<Package>> = Vec::new();
    while !graph.is_empty() {
        let sources: Vec<NodeIndex> = graph
            .indices()
            .filter(|&idx| graph.dependency_count(idx) == 0)
            .collect();

        if sources.is_empty() {
            let (king, rats) = isolate_cycle(&graph);
            debug!(
                king = %names(&graph, &king).join(", "),
                rats = %names(&graph, &rats).join(", "),
                "Isolating cycle"
            );
            for batch in [king, rats] {
                if batch.is_empty() {
                    continue;
                }
                batches.push(to_packages(&graph, &batch));
                graph.prune_indices(&batch);
            }
            continue;
        }

        debug!(batch = %names(&graph, &sources).join(", "), "Batch");
        batches.push(to_packages(&graph, &sources));
        graph.prune_indices(&sources);
    }

    Ok(batches)
}

/// Pick the cycle to break next and split it into king and rats.
///
/// Only called when every remaining node has a dependency, so at least one
/// strongly connected component with more than one member exists and one of
/// them has no dependency outside itself.
fn isolate_cycle(graph: &PackageGraph) -> (Vec<NodeIndex>, Vec<NodeIndex>) {
    let mut components = graph.strongly_connected_components();
    for component in &mut components {
        component.sort_unstable();
    }
    components.sort_by_key(|component| component.first().copied());

    let ready = components.iter().find(|component| {
        component.len() > 1
            && component.iter().all(|&idx| {
                graph
                    .dependency_indices(idx)
                    .iter()
                    .all(|dep| component.contains(dep))
            })
    });

    let mut members: Vec<NodeIndex> = match ready {
        Some(component) => component.clone(),
        None => graph.indices().collect(),
    };

    members.sort_by_key(|&idx| (Reverse(graph.dependent_count(idx)), idx));
    let rats = members.split_off(1.min(members.len()));
    (members, rats)
}

fn to_packages(graph: &PackageGraph, indices: &[NodeIndex]) -> Vec<Package> {
    indices
        .iter()
        .filter_map(|&idx| graph.node(idx).map(|node| node.package().clone()))
        .collect()
}

fn names(graph: &PackageGraph, indices: &[NodeIndex]) -> Vec<String> {
    indices
        .iter()
        .filter_map(|&idx| graph.node(idx).map(|node| node.name().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pkg(name: &str, deps: &[&str]) -> Package {
        deps.iter().fold(
            Package::new(name, "1.0.0", format!("/repo/{name}")),
            |p, dep| p.with_dependency(*dep, "^1.0.0"),
        )
    }

    fn batch_names(batches: &[Vec<Package>]) -> Vec<Vec<&str>> {
        batches
            .iter()
            .map(|batch| batch.iter().map(|p| p.name.as_str()).collect())
            .collect()
    }

    #[test]
    fn test_linear_chain() {
        let packages = vec![pkg("a", &[]), pkg("b", &["a"]), pkg("c", &["b", "a"])];
        let batches = batch_packages(&packages, GraphType::AllDependencies, false).unwrap();
        assert_eq!(batch_names(&batches), vec![vec!["a"], vec!["b"], vec!["c"]]);
    }

    #[test]
    fn test_independent_packages_share_a_batch() {
        let packages = vec![pkg("a", &[]), pkg("b", &[]), pkg("c", &["a", "b"])];
        let batches = batch_packages(&packages, GraphType::AllDependencies, false).unwrap();
        assert_eq!(batch_names(&batches), vec![vec!["a", "b"], vec!["c"]]);
    }

    #[test]
    fn test_dev_dependencies_follow_graph_type() {
        let packages = vec![
            Package::new("a", "1.0.0", "/repo/a"),
            Package::new("b", "1.0.0", "/repo/b").with_dev_dependency("a", "^1.0.0"),
        ];
        let all = batch_packages(&packages, GraphType::AllDependencies, false).unwrap();
        assert_eq!(batch_names(&all), vec![vec!["a"], vec!["b"]]);

        let prod = batch_packages(&packages, GraphType::Dependencies, false).unwrap();
        assert_eq!(batch_names(&prod), vec![vec!["a", "b"]]);
    }

    #[test]
    fn test_cycle_is_isolated_king_first() {
        // a <-> b, c and d depend on b, e depends on c
        let packages = vec![
            pkg("a", &["b"]),
            pkg("b", &["a"]),
            pkg("c", &["b"]),
            pkg("d", &["b"]),
            pkg("e", &["c"]),
        ];
        let batches = batch_packages(&packages, GraphType::AllDependencies, false).unwrap();
        assert_eq!(
            batch_names(&batches),
            vec![vec!["b"], vec!["a"], vec!["c", "d"], vec!["e"]]
        );
    }

    #[test]
    fn test_cycle_after_its_dependencies() {
        let packages = vec![pkg("base", &[]), pkg("a", &["base", "b"]), pkg("b", &["a"])];
        let batches = batch_packages(&packages, GraphType::AllDependencies, false).unwrap();
        assert_eq!(
            batch_names(&batches),
            vec![vec!["base"], vec!["a"], vec!["b"]]
        );
    }

    #[test]
    fn test_reject_cycles() {
        let packages = vec![pkg("a", &["b"]), pkg("b", &["a"])];
        let err = batch_packages(&packages, GraphType::AllDependencies, true).unwrap_err();
        assert_eq!(err.code(), "ECYCLE");
    }

    #[test]
    fn test_empty_input() {
        let batches = batch_packages(&[], GraphType::AllDependencies, false).unwrap();
        assert!(batches.is_empty());
    }
}
