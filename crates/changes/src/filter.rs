//! Narrowing the package list for a command.

use crate::error::{Error, Result};
use crate::oracle::ChangeOracle;
use crate::updates::{UpdateOptions, collect_updates};
use glob::{MatchOptions, Pattern};
use monorail_package_graph::PackageGraph;
use monorail_workspace::Package;
use std::collections::HashSet;
use tracing::info;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

/// Keep the packages whose names match `include` and not `exclude`.
///
/// Patterns apply in order, so an exclude removes what the includes added.
/// With only excludes, every package starts included. Private packages are
/// dropped unless `show_private` is set.
///
/// # Errors
///
/// Returns [`Error::InvalidPattern`] for a malformed glob, and
/// [`Error::NoPackagesMatched`] if patterns were given, nothing is left, and
/// `continue_if_no_match` is not set.
pub fn filter_packages(
    packages: &[Package],
    include: &[String],
    exclude: &[String],
    show_private: bool,
    continue_if_no_match: bool,
) -> Result<Vec<Package>> {
    let mut filtered: Vec<Package> = packages
        .iter()
        .filter(|package| show_private || !package.private)
        .cloned()
        .collect();

    let mut patterns: Vec<String> = include.to_vec();
    patterns.extend(exclude.iter().map(|pattern| format!("!{pattern}")));

    if patterns.is_empty() {
        return Ok(filtered);
    }

    info!(patterns = ?patterns, "Filtering packages");

    let mut effective = patterns.clone();
    if include.is_empty() {
        effective.insert(0, "**".to_string());
    }

    let names: Vec<String> = filtered.iter().map(|p| p.name.clone()).collect();
    let chosen = multimatch(&names, &effective)?;
    filtered.retain(|package| chosen.contains(package.name.as_str()));

    if filtered.is_empty() && !continue_if_no_match {
        return Err(Error::NoPackagesMatched { patterns });
    }

    Ok(filtered)
}

/// Apply positive and `!`-negated globs in order.
fn multimatch<'a>(names: &'a [String], patterns: &[String]) -> Result<HashSet<&'a str>> {
    let mut chosen: HashSet<&'a str> = HashSet::new();

    for raw in patterns {
        let (negated, glob) = match raw.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, raw.as_str()),
        };
        let pattern =
            Pattern::new(glob).map_err(|e| Error::invalid_pattern(raw, e.msg.to_string()))?;

        if negated {
            chosen.retain(|name| !pattern.matches_with(name, MATCH_OPTIONS));
        } else {
            chosen.extend(
                names
                    .iter()
                    .map(String::as_str)
                    .filter(|name| pattern.matches_with(name, MATCH_OPTIONS)),
            );
        }
    }

    Ok(chosen)
}

/// Options shared by every command that selects packages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOptions {
    /// Only packages with names matching these globs.
    pub scope: Vec<String>,
    /// Skip packages with names matching these globs.
    pub ignore: Vec<String>,
    /// Keep private packages.
    pub show_private: bool,
    /// Only packages changed since this reference; empty means the last tag.
    pub since: Option<String>,
    /// With `since`, do not add the dependents of changed packages.
    pub exclude_dependents: bool,
    /// Add every package that depends on a selected package.
    pub include_dependents: bool,
    /// Add every package a selected package depends on.
    pub include_dependencies: bool,
    /// An empty selection is not an error.
    pub continue_if_no_match: bool,
    /// With `since`, consider tags from merged branches.
    pub include_merged_tags: bool,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            scope: Vec::new(),
            ignore: Vec::new(),
            show_private: true,
            since: None,
            exclude_dependents: false,
            include_dependents: false,
            include_dependencies: false,
            continue_if_no_match: false,
            include_merged_tags: false,
        }
    }
}

/// Select the packages of `graph` a command should act on.
///
/// Applies the scope and ignore filters, then the optional change filter,
/// then the optional dependent and dependency extensions, in that order.
///
/// # Errors
///
/// Returns an error if filtering leaves nothing (see [`filter_packages`]) or
/// change detection fails.
pub fn get_filtered_packages(
    graph: &PackageGraph,
    oracle: &dyn ChangeOracle,
    options: &FilterOptions,
) -> Result<Vec<Package>> {
    let all: Vec<Package> = graph.raw_package_list().into_iter().cloned().collect();
    let mut filtered = filter_packages(
        &all,
        &options.scope,
        &options.ignore,
        options.show_private,
        options.continue_if_no_match,
    )?;

    if let Some(since) = &options.since {
        info!(since = %since, "Filtering to packages changed since reference");
        if options.exclude_dependents {
            info!("Excluding dependents");
        }
        if options.include_merged_tags {
            info!("Including merged tags");
        }

        let updates = collect_updates(
            &filtered,
            graph,
            oracle,
            &UpdateOptions {
                since: Some(since.clone()),
                exclude_dependents: options.exclude_dependents,
                include_merged_tags: options.include_merged_tags,
                ..UpdateOptions::default()
            },
        )?;
        let updated: HashSet<&str> = updates.iter().map(|p| p.name.as_str()).collect();
        filtered.retain(|package| updated.contains(package.name.as_str()));
    }

    if options.include_dependents {
        info!("Including dependents");
        filtered = graph
            .add_dependents(filtered.iter().map(|p| p.name.as_str()))
            .into_iter()
            .cloned()
            .collect();
    }

    if options.include_dependencies {
        info!("Including dependencies");
        filtered = graph
            .add_dependencies(filtered.iter().map(|p| p.name.as_str()))
            .into_iter()
            .cloned()
            .collect();
    }

    Ok(filtered)
}
