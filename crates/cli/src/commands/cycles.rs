//! `monorail cycles`

use super::Repository;
use crate::cli::{CliError, GraphArgs};
use crate::output::Render;
use serde::Serialize;

/// Every dependency cycle of the repository.
#[derive(Debug, Serialize)]
pub struct CyclesReport {
    /// Each collapsed cycle rendered as `a -> b -> a`, nested cycles inline.
    pub cycles: Vec<String>,
    /// Names of every package on a cycle.
    pub members: Vec<String>,
}

impl Render for CyclesReport {
    fn render_text(&self) -> String {
        if self.cycles.is_empty() {
            return "No dependency cycles found".to_string();
        }
        self.cycles.join("\n")
    }
}

/// Execute the cycles command.
///
/// # Errors
///
/// Returns an error if the graph cannot be built, or cycles exist and are
/// rejected.
pub fn execute(repository: &Repository, graph_args: &GraphArgs) -> Result<CyclesReport, CliError> {
    let settings = graph_args.resolve(&repository.config.graph);
    let graph = repository.graph(&settings)?;
    let cycles = graph.collapse_cycles(settings.reject_cycles)?;

    let mut members: Vec<String> = cycles
        .iter()
        .flat_map(|cycle| cycle.flatten(&cycles))
        .filter_map(|idx| graph.node(idx).map(|node| node.name().to_string()))
        .collect();
    members.sort();

    Ok(CyclesReport {
        cycles: cycles.iter().map(|cycle| cycle.render(&cycles)).collect(),
        members,
    })
}
