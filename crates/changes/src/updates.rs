//! Deciding which packages count as updated.

use crate::error::{Error, Result};
use crate::oracle::ChangeOracle;
use glob::{MatchOptions, Pattern};
use monorail_package_graph::{NodeIndex, PackageGraph};
use monorail_workspace::Package;
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::path::Path;
use tracing::{debug, info, warn};

/// Settings for [`collect_updates`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Reference to diff against. `None` or empty means the last tag.
    pub since: Option<String>,
    /// Package name globs that always count as updated; `"*"` forces all.
    pub force_publish: Vec<String>,
    /// Changed-file globs that never mark a package as updated.
    pub ignore_changes: Vec<String>,
    /// Compare only the most recent commit.
    pub canary: bool,
    /// Requested version bump keyword, e.g. `major` or `prerelease`.
    pub bump: Option<String>,
    /// Do not extend updates with their local dependents.
    pub exclude_dependents: bool,
    /// Consider tags on merged branches, not only the first-parent history.
    pub include_merged_tags: bool,
}

impl UpdateOptions {
    fn forces_all(&self) -> bool {
        self.force_publish.iter().any(|name| name == "*")
    }

    fn bumps_out_of_prerelease(&self) -> bool {
        self.bump
            .as_deref()
            .is_some_and(|bump| !bump.starts_with("pre"))
    }
}

/// Packages among `filtered` that changed since the last release.
///
/// Candidates are the forced packages, prerelease packages when a
/// non-prerelease bump was requested, and packages whose location holds
/// changed files not matched by `ignore_changes`. Unless
/// `exclude_dependents` is set, the local dependents of every candidate are
/// added too. The result keeps the order of `graph`.
///
/// # Errors
///
/// Returns an error if a glob is invalid or the oracle fails.
pub fn collect_updates(
    filtered: &[Package],
    graph: &PackageGraph,
    oracle: &dyn ChangeOracle,
    options: &UpdateOptions,
) -> Result<Vec<Package>> {
    let selected: Vec<NodeIndex> = if filtered.len() == graph.len() {
        graph.indices().collect()
    } else {
        let mut selected: Vec<NodeIndex> = filtered
            .iter()
            .filter_map(|package| graph.index_of(&package.name))
            .collect();
        selected.sort_unstable();
        selected.dedup();
        selected
    };

    let forced = NameMatcher::new(&options.force_publish)?;
    let mut committish = options.since.clone().filter(|since| !since.is_empty());

    if let Some(described) = oracle.describe(options.include_merged_tags)? {
        if described.ref_count == 0 && forced.is_empty() && committish.is_none() {
            info!("Current HEAD is already released, skipping change detection");
            return Ok(Vec::new());
        }

        if options.canary {
            committish = Some(format!("{0}^..{0}", described.sha));
        } else if committish.is_none() {
            committish = Some(described.last_tag_name);
        }
    }

    if !forced.is_empty() {
        warn!(
            "force-publish {}",
            if options.forces_all() {
                "all packages".to_string()
            } else {
                options.force_publish.join(", ")
            }
        );
    }

    let mut candidates: BTreeSet<NodeIndex> = BTreeSet::new();
    match committish {
        Some(committish) if !options.forces_all() => {
            let ignored = IgnoreFilter::new(&options.ignore_changes)?;
            for &idx in &selected {
                let Some(node) = graph.node(idx) else {
                    continue;
                };
                let is_candidate = forced.matches(node.name())
                    || (options.bumps_out_of_prerelease() && node.prerelease_id().is_some())
                    || has_diff(oracle, &committish, node.name(), node.location(), &ignored)?;
                if is_candidate {
                    candidates.insert(idx);
                }
            }
        }
        _ => {
            debug!("No reference to compare against, every package is a candidate");
            candidates.extend(selected.iter().copied());
        }
    }

    if !options.exclude_dependents {
        let dependents = collect_dependents(graph, &candidates);
        candidates.extend(dependents);
    }

    Ok(selected
        .into_iter()
        .filter(|idx| candidates.contains(idx))
        .filter_map(|idx| graph.node(idx).map(|node| node.package().clone()))
        .collect())
}

fn has_diff(
    oracle: &dyn ChangeOracle,
    committish: &str,
    name: &str,
    location: &Path,
    ignored: &IgnoreFilter,
) -> Result<bool> {
    let changed = oracle.changed_files_since(committish, location)?;
    if changed.is_empty() {
        debug!(package = %name, "No diff found");
        return Ok(false);
    }

    let remaining: Vec<&String> = changed
        .iter()
        .filter(|file| !ignored.matches(file))
        .collect();

    if remaining.is_empty() {
        debug!(package = %name, "No diff found after ignoring changes");
    } else {
        debug!(package = %name, files = ?remaining, "Filtered diff");
    }
    Ok(!remaining.is_empty())
}

/// Every transitive local dependent of `nodes`.
///
/// A node whose dependents include the starting node sits on a cycle through
/// it: the node itself is collected, but its dependents are not.
#[must_use]
pub fn collect_dependents(graph: &PackageGraph, nodes: &BTreeSet<NodeIndex>) -> BTreeSet<NodeIndex> {
    let mut collected = BTreeSet::new();

    for &current in nodes {
        if graph.dependent_count(current) == 0 {
            continue;
        }

        let mut queue = VecDeque::from([current]);
        let mut seen: HashSet<NodeIndex> = HashSet::new();

        while let Some(idx) = queue.pop_front() {
            for dependent in graph.dependent_indices(idx) {
                if !seen.insert(dependent) {
                    continue;
                }
                if dependent == current || graph.dependent_indices(idx).contains(&current) {
                    continue;
                }
                collected.insert(dependent);
                queue.push_back(dependent);
            }
        }
    }

    collected
}

/// Package-name globs; a literal `"*"` matches everything.
#[derive(Debug, Default)]
struct NameMatcher {
    patterns: Vec<Pattern>,
}

impl NameMatcher {
    fn new(globs: &[String]) -> Result<Self> {
        let patterns = globs
            .iter()
            .map(|glob| {
                Pattern::new(glob).map_err(|e| Error::invalid_pattern(glob, e.msg.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    fn matches(&self, name: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(name))
    }
}

/// Globs over repository-relative file paths. A glob without a `/` matches
/// the file name at any depth.
#[derive(Debug)]
struct IgnoreFilter {
    patterns: Vec<(Pattern, bool)>,
}

impl IgnoreFilter {
    const OPTIONS: MatchOptions = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };

    fn new(globs: &[String]) -> Result<Self> {
        if !globs.is_empty() {
            info!(patterns = ?globs, "Ignoring diff in paths matching");
        }
        let patterns = globs
            .iter()
            .map(|glob| {
                Pattern::new(glob)
                    .map(|pattern| (pattern, !glob.contains('/')))
                    .map_err(|e| Error::invalid_pattern(glob, e.msg.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    fn matches(&self, file: &str) -> bool {
        let base = file.rsplit('/').next().unwrap_or(file);
        self.patterns.iter().any(|(pattern, match_base)| {
            let subject = if *match_base { base } else { file };
            pattern.matches_with(subject, Self::OPTIONS)
        })
    }
}
