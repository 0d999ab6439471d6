//! npm-flavoured version range matching on top of the `semver` crate.
//!
//! Cargo's requirement syntax differs from npm's in a few places that matter
//! for sibling resolution: a bare `1.2.3` is an exact match in npm but a caret
//! requirement in Cargo, comparators are separated by whitespace instead of
//! commas, and npm additionally has `||` alternatives, hyphen ranges and
//! `~>`. [`VersionRange::parse`] rewrites each npm comparator set into an
//! equivalent [`VersionReq`]. Prerelease handling is identical in both
//! ecosystems, so it is left to `semver`.

use semver::{Version, VersionReq};
use std::fmt;

/// Requirement text that no version can satisfy.
const UNSATISFIABLE: &str = "<0.0.0-0";

const OPERATORS: [&str; 8] = [">=", "<=", "~>", ">", "<", "=", "~", "^"];

/// A parsed npm range: a disjunction of comparator sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    raw: String,
    alternatives: Vec<VersionReq>,
}

impl VersionRange {
    /// Parse an npm range such as `^1.2.0 || >=2.0.0-beta <3`.
    ///
    /// Returns `None` when any alternative is not a valid range.
    #[must_use]
    pub fn parse(range: &str) -> Option<Self> {
        let alternatives = range
            .split("||")
            .map(translate_set)
            .map(|set| set.and_then(|text| VersionReq::parse(&text).ok()))
            .collect::<Option<Vec<_>>>()?;

        Some(Self {
            raw: range.trim().to_string(),
            alternatives,
        })
    }

    /// Whether `version` falls inside any alternative.
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }

    /// The range as originally written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Parse a version leniently: surrounding whitespace and a leading `v` or `=`
/// are ignored.
#[must_use]
pub fn parse_version(version: &str) -> Option<Version> {
    let trimmed = version.trim();
    let trimmed = trimmed.strip_prefix('=').unwrap_or(trimmed).trim_start();
    let trimmed = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);
    Version::parse(trimmed).ok()
}

/// Whether `version` satisfies the npm `range`. Unparsable input never matches.
#[must_use]
pub fn satisfies(version: &str, range: &str) -> bool {
    match (parse_version(version), VersionRange::parse(range)) {
        (Some(version), Some(range)) => range.matches(&version),
        _ => false,
    }
}

/// Whether `range` parses as an npm range.
#[must_use]
pub fn is_valid_range(range: &str) -> bool {
    VersionRange::parse(range).is_some()
}

/// Rewrite one whitespace-separated npm comparator set as Cargo requirement text.
fn translate_set(set: &str) -> Option<String> {
    let tokens = tokenize(set);

    if tokens.is_empty() {
        return Some("*".to_string());
    }

    if tokens.len() == 3 && tokens[1] == "-" {
        let lower = translate_comparator(&format!(">={}", tokens[0]))?;
        let upper = translate_comparator(&format!("<={}", tokens[2]))?;
        return Some(join_comparators(vec![lower, upper]));
    }

    let comparators = tokens
        .iter()
        .map(|token| translate_comparator(token))
        .collect::<Option<Vec<_>>>()?;
    Some(join_comparators(comparators))
}

/// Split on whitespace, gluing a detached operator onto the version after it.
fn tokenize(set: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut pending_operator: Option<&str> = None;

    for word in set.split_whitespace() {
        if OPERATORS.contains(&word) {
            pending_operator = Some(word);
            continue;
        }
        match pending_operator.take() {
            Some(op) => tokens.push(format!("{op}{word}")),
            None => tokens.push(word.to_string()),
        }
    }
    if let Some(op) = pending_operator {
        tokens.push(op.to_string());
    }
    tokens
}

/// Combine comparators, dropping redundant `*` when anything else remains.
fn join_comparators(comparators: Vec<String>) -> String {
    let specific: Vec<String> = comparators.iter().filter(|c| *c != "*").cloned().collect();
    if specific.is_empty() {
        "*".to_string()
    } else {
        specific.join(", ")
    }
}

fn translate_comparator(token: &str) -> Option<String> {
    let (op, rest) = split_operator(token);
    let op = if op == "~>" { "~" } else { op };

    let rest = rest.trim_start_matches('=');
    let rest = rest
        .strip_prefix('v')
        .or_else(|| rest.strip_prefix('V'))
        .unwrap_or(rest);
    let rest = rest.split('+').next().unwrap_or(rest);

    let version = truncate_wildcards(rest)?;
    if version.is_empty() {
        return Some(match op {
            ">" | "<" => UNSATISFIABLE.to_string(),
            _ => "*".to_string(),
        });
    }

    let op = if op.is_empty() { "=" } else { op };
    Some(format!("{op}{version}"))
}

fn split_operator(token: &str) -> (&str, &str) {
    for op in OPERATORS {
        if let Some(rest) = token.strip_prefix(op) {
            return (op, rest);
        }
    }
    ("", token)
}

/// Cut a partial version at its first wildcard component: `1.x` becomes `1`,
/// `*` becomes the empty string. A prerelease after a wildcard is dropped.
fn truncate_wildcards(version: &str) -> Option<String> {
    let (core, prerelease) = match version.split_once('-') {
        Some((core, pre)) => (core, Some(pre)),
        None => (version, None),
    };

    let mut parts = Vec::new();
    for part in core.split('.') {
        if matches!(part, "*" | "x" | "X") {
            return Some(parts.join("."));
        }
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        parts.push(part);
    }

    if parts.len() > 3 {
        return None;
    }

    let mut out = parts.join(".");
    if let Some(pre) = prerelease {
        if parts.len() != 3 {
            return None;
        }
        out.push('-');
        out.push_str(pre);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_version_is_exact() {
        assert!(satisfies("1.2.3", "1.2.3"));
        assert!(!satisfies("1.2.4", "1.2.3"));
        assert!(satisfies("1.2.3", "=1.2.3"));
        assert!(satisfies("1.2.3", "v1.2.3"));
    }

    #[test]
    fn test_caret_and_tilde() {
        assert!(satisfies("1.9.0", "^1.0.0"));
        assert!(!satisfies("2.0.0", "^1.0.0"));
        assert!(satisfies("0.2.5", "^0.2.3"));
        assert!(!satisfies("0.3.0", "^0.2.3"));
        assert!(satisfies("1.2.9", "~1.2.3"));
        assert!(!satisfies("1.3.0", "~1.2.3"));
        assert!(satisfies("1.2.9", "~>1.2.3"));
    }

    #[test]
    fn test_whitespace_comparator_sets() {
        assert!(satisfies("1.5.0", ">=1.2.3 <2.0.0"));
        assert!(!satisfies("2.0.0", ">=1.2.3 <2.0.0"));
        assert!(satisfies("1.5.0", ">= 1.2.3 < 2.0.0"));
    }

    #[test]
    fn test_alternatives() {
        assert!(satisfies("3.1.0", "^1.0.0 || ^3.0.0"));
        assert!(!satisfies("2.1.0", "^1.0.0 || ^3.0.0"));
    }

    #[test]
    fn test_hyphen_ranges() {
        assert!(satisfies("1.2.3", "1.2.3 - 2.3.4"));
        assert!(satisfies("2.3.4", "1.2.3 - 2.3.4"));
        assert!(!satisfies("2.3.5", "1.2.3 - 2.3.4"));
        assert!(satisfies("2.3.9", "1.2.3 - 2.3"));
        assert!(!satisfies("2.4.0", "1.2.3 - 2.3"));
    }

    #[test]
    fn test_x_ranges() {
        assert!(satisfies("9.9.9", "*"));
        assert!(satisfies("9.9.9", ""));
        assert!(satisfies("1.4.0", "1.x"));
        assert!(satisfies("1.2.7", "1.2.*"));
        assert!(!satisfies("1.3.0", "1.2.X"));
        assert!(satisfies("1.0.0", "1"));
        assert!(!satisfies("2.0.0", "1"));
        assert!(satisfies("1.9.9", "^1.x"));
        assert!(!satisfies("1.0.0", ">*"));
    }

    #[test]
    fn test_prerelease_exclusion() {
        assert!(!satisfies("2.0.0-beta.1", "^1.0.0"));
        assert!(!satisfies("1.3.0-beta.1", "^1.0.0"));
        assert!(satisfies("1.3.0-beta.2", "^1.3.0-beta.1"));
        assert!(!satisfies("1.4.0-beta.2", "^1.3.0-beta.1"));
        assert!(satisfies("1.0.0-alpha", "1.0.0-alpha"));
    }

    #[test]
    fn test_invalid_input_never_matches() {
        assert!(!satisfies("1.0.0", "latest"));
        assert!(!satisfies("not-a-version", "^1.0.0"));
        assert!(!satisfies("1.0.0", "1.2.3.4"));
        assert!(!is_valid_range("next"));
        assert!(is_valid_range(">=1.0.0 <2 || 3.x"));
    }

    #[test]
    fn test_parse_version_loose() {
        assert_eq!(parse_version(" v1.2.3 "), Some(Version::new(1, 2, 3)));
        assert_eq!(parse_version("=1.2.3"), Some(Version::new(1, 2, 3)));
        assert_eq!(parse_version("^1.2.3"), None);
        assert_eq!(parse_version("1.2"), None);
    }

    #[test]
    fn test_display_keeps_raw() {
        let range = VersionRange::parse(" ^1.0.0 ").unwrap();
        assert_eq!(range.to_string(), "^1.0.0");
        assert_eq!(range.as_str(), "^1.0.0");
    }
}
