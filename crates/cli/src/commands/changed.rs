//! `monorail changed`

use super::{PackageSummary, Repository};
use crate::cli::{ChangedArgs, CliError, GraphArgs};
use crate::output::Render;
use monorail_changes::{ChangeOracle, UpdateOptions, collect_updates};
use serde::Serialize;
use std::path::PathBuf;
use tracing::warn;

/// Packages changed since the last release.
#[derive(Debug, Serialize)]
pub struct ChangedReport {
    #[serde(skip)]
    root: PathBuf,
    /// Changed packages in graph order.
    pub packages: Vec<PackageSummary>,
}

impl Render for ChangedReport {
    fn render_text(&self) -> String {
        self.packages
            .iter()
            .map(|package| package.render_line(&self.root))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Execute the changed command.
///
/// Private packages are never reported.
///
/// # Errors
///
/// Returns an error if the graph cannot be built or git fails.
pub fn execute(
    repository: &Repository,
    args: &ChangedArgs,
    graph_args: &GraphArgs,
    oracle: &dyn ChangeOracle,
) -> Result<ChangedReport, CliError> {
    let settings = graph_args.resolve(&repository.config.graph);
    let graph = repository.graph(&settings)?;

    let mut ignore_changes = repository.config.ignore_changes.clone();
    ignore_changes.extend(args.ignore_changes.iter().cloned());

    let options = UpdateOptions {
        since: None,
        force_publish: args.force_publish.clone(),
        ignore_changes,
        canary: args.canary,
        bump: None,
        exclude_dependents: args.exclude_dependents,
        include_merged_tags: args.include_merged_tags,
    };

    let updates = collect_updates(&repository.packages, &graph, oracle, &options)?;
    let packages: Vec<PackageSummary> = updates
        .iter()
        .filter(|package| !package.private)
        .map(PackageSummary::from)
        .collect();

    if packages.is_empty() {
        warn!("No changed packages found");
    }

    Ok(ChangedReport {
        root: repository.root.clone(),
        packages,
    })
}
