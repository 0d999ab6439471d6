//! `monorail list`

use super::{PackageSummary, Repository};
use crate::cli::{CliError, FilterArgs};
use crate::output::Render;
use monorail_changes::{ChangeOracle, get_filtered_packages};
use serde::Serialize;
use std::path::PathBuf;

/// The selected packages.
#[derive(Debug, Serialize)]
pub struct ListReport {
    #[serde(skip)]
    root: PathBuf,
    /// Selected packages in graph order.
    pub packages: Vec<PackageSummary>,
}

impl Render for ListReport {
    fn render_text(&self) -> String {
        self.packages
            .iter()
            .map(|package| package.render_line(&self.root))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Execute the list command.
///
/// # Errors
///
/// Returns an error if the graph cannot be built or filtering fails.
pub fn execute(
    repository: &Repository,
    filter: &FilterArgs,
    oracle: &dyn ChangeOracle,
) -> Result<ListReport, CliError> {
    let graph = repository.graph(&repository.config.graph)?;
    let selected = get_filtered_packages(&graph, oracle, &filter.to_options())?;

    Ok(ListReport {
        root: repository.root.clone(),
        packages: selected.iter().map(PackageSummary::from).collect(),
    })
}
