//! `monorail graph`

use super::Repository;
use crate::cli::{CliError, FilterArgs, GraphArgs};
use crate::output::Render;
use monorail_changes::{ChangeOracle, get_filtered_packages};
use serde::Serialize;
use std::fmt::Write;

/// One package and what it depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEntry {
    /// Package name.
    pub name: String,
    /// Names of local dependencies.
    pub dependencies: Vec<String>,
    /// Names of external dependencies, only with `--all`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external: Option<Vec<String>>,
}

/// Dependencies of every selected package.
#[derive(Debug, Serialize)]
pub struct GraphReport {
    /// Entries in graph order.
    pub packages: Vec<GraphEntry>,
}

impl Render for GraphReport {
    fn render_text(&self) -> String {
        let mut out = String::new();
        for entry in &self.packages {
            let _ = writeln!(out, "{}", entry.name);
            for dependency in &entry.dependencies {
                let _ = writeln!(out, "  -> {dependency}");
            }
            for dependency in entry.external.iter().flatten() {
                let _ = writeln!(out, "  -> {dependency} (external)");
            }
        }
        out.trim_end().to_string()
    }
}

/// Execute the graph command.
///
/// # Errors
///
/// Returns an error if the graph cannot be built or filtering fails.
pub fn execute(
    repository: &Repository,
    filter: &FilterArgs,
    graph_args: &GraphArgs,
    all: bool,
    oracle: &dyn ChangeOracle,
) -> Result<GraphReport, CliError> {
    let settings = graph_args.resolve(&repository.config.graph);
    let graph = repository.graph(&settings)?;
    let selected = get_filtered_packages(&graph, oracle, &filter.to_options())?;

    let packages = selected
        .iter()
        .filter_map(|package| graph.get(&package.name))
        .map(|node| GraphEntry {
            name: node.name().to_string(),
            dependencies: graph
                .local_dependencies(node.name())
                .into_iter()
                .map(|(dependency, _)| dependency.name().to_string())
                .collect(),
            external: all.then(|| node.external_dependencies().keys().cloned().collect()),
        })
        .collect();

    Ok(GraphReport { packages })
}
