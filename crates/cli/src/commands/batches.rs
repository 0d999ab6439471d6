//! `monorail batches` and `monorail toposort`

use super::Repository;
use crate::cli::{CliError, FilterArgs, GraphArgs};
use crate::output::Render;
use monorail_changes::{ChangeOracle, get_filtered_packages};
use monorail_package_graph::{QueryGraph, QueryOptions, batch_packages};
use monorail_workspace::Package;
use serde::Serialize;
use tracing::debug;

/// Batches of package names; each batch can run in parallel.
#[derive(Debug, Serialize)]
pub struct BatchesReport {
    /// Batches in execution order.
    pub batches: Vec<Vec<String>>,
}

impl Render for BatchesReport {
    fn render_text(&self) -> String {
        self.batches
            .iter()
            .enumerate()
            .map(|(i, batch)| format!("{}: {}", i + 1, batch.join(", ")))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Package names in dependency order.
#[derive(Debug, Serialize)]
pub struct ToposortReport {
    /// Names, dependencies first.
    pub packages: Vec<String>,
}

impl Render for ToposortReport {
    fn render_text(&self) -> String {
        self.packages.join("\n")
    }
}

fn selected(
    repository: &Repository,
    filter: &FilterArgs,
    graph_args: &GraphArgs,
    oracle: &dyn ChangeOracle,
) -> Result<(Vec<Package>, QueryOptions), CliError> {
    let settings = graph_args.resolve(&repository.config.graph);
    let graph = repository.graph(&settings)?;
    let packages = get_filtered_packages(&graph, oracle, &filter.to_options())?;
    debug!(count = packages.len(), graph_type = %settings.graph_type, "Selected packages");

    Ok((
        packages,
        QueryOptions {
            graph_type: settings.graph_type,
            force_local: settings.force_local,
            reject_cycles: settings.reject_cycles,
        },
    ))
}

/// Execute the batches command.
///
/// # Errors
///
/// Returns an error if selection fails, or cycles exist and are rejected.
pub fn execute_batches(
    repository: &Repository,
    filter: &FilterArgs,
    graph_args: &GraphArgs,
    oracle: &dyn ChangeOracle,
) -> Result<BatchesReport, CliError> {
    let (packages, options) = selected(repository, filter, graph_args, oracle)?;
    let batches = batch_packages(&packages, options.graph_type, options.reject_cycles)?;

    Ok(BatchesReport {
        batches: batches
            .into_iter()
            .map(|batch| batch.into_iter().map(|package| package.name).collect())
            .collect(),
    })
}

/// Execute the toposort command.
///
/// # Errors
///
/// Returns an error if selection fails, or cycles exist and are rejected.
pub fn execute_toposort(
    repository: &Repository,
    filter: &FilterArgs,
    graph_args: &GraphArgs,
    oracle: &dyn ChangeOracle,
) -> Result<ToposortReport, CliError> {
    let (packages, options) = selected(repository, filter, graph_args, oracle)?;
    let sorted = QueryGraph::toposort(&packages, &options)?;

    Ok(ToposortReport {
        packages: sorted.into_iter().map(|package| package.name).collect(),
    })
}
