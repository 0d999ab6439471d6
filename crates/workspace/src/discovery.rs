//! Package discovery from directory globs.
//!
//! Discovery walks the repository once, matches every directory against the
//! configured package globs and reads the `package.json` found there.
//!
//! # Usage
//!
//! ```rust,ignore
//! use monorail_workspace::{ProjectConfig, discover_packages};
//! use std::path::Path;
//!
//! let root = Path::new(".");
//! let config = ProjectConfig::load(root)?;
//! let packages = discover_packages(root, &config)?;
//! ```

use crate::config::ProjectConfig;
use crate::error::{Error, Result};
use crate::package::{MANIFEST_FILE_NAME, Package};
use glob::Pattern;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Directories that are never searched for packages.
const PRUNED_DIRECTORIES: [&str; 4] = ["node_modules", ".git", "target", "dist"];

/// Resolves glob patterns to find directories, handling exclusions.
///
/// # Arguments
///
/// * `root` - The root directory to resolve patterns from.
/// * `patterns` - List of glob patterns to match (e.g., "packages/*").
///   Patterns starting with "!" are treated as exclusions, and a pattern of
///   "." selects the root directory itself.
///
/// # Returns
///
/// A sorted list of unique paths (rooted under `root`) that match the
/// patterns and are not excluded.
///
/// # Errors
///
/// Returns an error if any glob pattern is invalid.
pub fn resolve_glob_patterns(root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut matched_paths = HashSet::new();
    let mut inclusion_patterns = Vec::new();
    let mut exclusion_patterns = Vec::new();
    let mut include_root = false;

    for raw in patterns {
        let (negated, pattern) = match raw.strip_prefix('!') {
            Some(stripped) => (true, stripped),
            None => (false, raw.as_str()),
        };
        let pattern = normalize_pattern(pattern);

        if pattern == "." {
            include_root = !negated;
            continue;
        }

        let compiled = Pattern::new(&pattern).map_err(|e| Error::InvalidPattern {
            pattern: raw.clone(),
            message: e.to_string(),
        })?;

        if negated {
            exclusion_patterns.push(compiled);
        } else {
            inclusion_patterns.push(compiled);
        }
    }

    if include_root {
        matched_paths.insert(root.to_path_buf());
    }

    let walker = WalkDir::new(root).follow_links(false);

    for entry in walker
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_str().unwrap_or("");
            !PRUNED_DIRECTORIES.contains(&name)
        })
        .filter_map(std::result::Result::ok)
    {
        if !entry.file_type().is_dir() {
            continue;
        }

        let path = entry.path();
        if path == root {
            continue;
        }

        let Ok(rel_path) = path.strip_prefix(root) else {
            continue;
        };

        if exclusion_patterns.iter().any(|p| p.matches_path(rel_path)) {
            continue;
        }

        if inclusion_patterns.iter().any(|p| p.matches_path(rel_path)) {
            matched_paths.insert(path.to_path_buf());
        }
    }

    let mut result: Vec<PathBuf> = matched_paths.into_iter().collect();
    result.sort();
    Ok(result)
}

/// Trim trailing separators and a trailing `package.json` from a glob.
fn normalize_pattern(pattern: &str) -> String {
    let trimmed = pattern.trim();
    let trimmed = trimmed
        .strip_suffix(MANIFEST_FILE_NAME)
        .unwrap_or(trimmed)
        .trim_end_matches('/');
    let trimmed = trimmed.strip_prefix("./").unwrap_or(trimmed);
    if trimmed.is_empty() {
        ".".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Discover every package of the repository rooted at `root`.
///
/// Directories matched by the package globs that contain no `package.json`
/// are skipped. Packages are returned sorted by location.
///
/// # Errors
///
/// Returns an error if the globs cannot be resolved or a matched manifest
/// cannot be read or parsed.
pub fn discover_packages(root: &Path, config: &ProjectConfig) -> Result<Vec<Package>> {
    let globs = config.package_globs(root)?;
    debug!(root = %root.display(), ?globs, "Discovering packages");

    let mut packages = Vec::new();
    for dir in resolve_glob_patterns(root, &globs)? {
        let manifest = dir.join(MANIFEST_FILE_NAME);
        if !manifest.is_file() {
            trace!(dir = %dir.display(), "No manifest, skipping");
            continue;
        }
        packages.push(Package::from_manifest(&manifest)?);
    }

    debug!(count = packages.len(), "Discovered packages");
    Ok(packages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_glob_patterns_basic() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir_all(root.join("packages/a")).unwrap();
        fs::create_dir_all(root.join("packages/b")).unwrap();
        fs::create_dir_all(root.join("apps/app1")).unwrap();

        let patterns = vec!["packages/*".to_string()];
        let result = resolve_glob_patterns(root, &patterns).unwrap();

        assert_eq!(result.len(), 2);
        assert!(result.iter().any(|p| p.ends_with("packages/a")));
        assert!(result.iter().any(|p| p.ends_with("packages/b")));
    }

    #[test]
    fn test_resolve_glob_patterns_negation_prefix() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir_all(root.join("packages/a")).unwrap();
        fs::create_dir_all(root.join("packages/b")).unwrap();
        fs::create_dir_all(root.join("packages/ignored")).unwrap();

        let patterns = vec!["packages/*".to_string(), "!packages/ignored".to_string()];
        let result = resolve_glob_patterns(root, &patterns).unwrap();

        assert_eq!(result.len(), 2);
        assert!(!result.iter().any(|p| p.ends_with("packages/ignored")));
    }

    #[test]
    fn test_resolve_glob_patterns_skips_node_modules() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir_all(root.join("packages/a")).unwrap();
        fs::create_dir_all(root.join("packages/a/node_modules/dep")).unwrap();

        let patterns = vec!["**".to_string()];
        let result = resolve_glob_patterns(root, &patterns).unwrap();

        assert!(!result.iter().any(|p| p.to_string_lossy().contains("node_modules")));
    }

    #[test]
    fn test_resolve_glob_patterns_root_and_trailing_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir_all(root.join("packages/a")).unwrap();

        let patterns = vec![".".to_string(), "packages/*/package.json".to_string()];
        let result = resolve_glob_patterns(root, &patterns).unwrap();

        assert_eq!(result.len(), 2);
        assert!(result.contains(&root.to_path_buf()));
        assert!(result.iter().any(|p| p.ends_with("packages/a")));
    }

    #[test]
    fn test_resolve_glob_patterns_invalid() {
        let temp_dir = TempDir::new().unwrap();
        let patterns = vec!["packages/[".to_string()];
        let result = resolve_glob_patterns(temp_dir.path(), &patterns);
        assert!(matches!(result, Err(Error::InvalidPattern { .. })));
    }

    #[test]
    fn test_normalize_pattern() {
        assert_eq!(normalize_pattern("packages/*/"), "packages/*");
        assert_eq!(normalize_pattern("./packages/*"), "packages/*");
        assert_eq!(normalize_pattern("package.json"), ".");
        assert_eq!(normalize_pattern("./"), ".");
    }
}
