//! Answers "what changed since" questions about a repository.

use crate::error::{Error, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;
use tracing::{debug, trace};

static DESCRIBE_WITH_TAG: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^((?:.*@)?(.*))-(\d+)-g([0-9a-f]+)(-dirty)?$").ok());

/// Where HEAD sits relative to the most recent release tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeRef {
    /// The tag name, e.g. `v1.2.0` or `pkg@1.2.0`.
    pub last_tag_name: String,
    /// The version part of the tag, e.g. `v1.2.0` or `1.2.0`.
    pub last_version: String,
    /// Commits between the tag and HEAD.
    pub ref_count: u64,
    /// Abbreviated HEAD commit.
    pub sha: String,
    /// Whether the working tree has uncommitted changes.
    pub is_dirty: bool,
}

impl DescribeRef {
    /// Parse `git describe --long --dirty` output.
    ///
    /// Returns `None` for output without a tag (the bare-sha form produced
    /// by `--always` when nothing is tagged).
    #[must_use]
    pub fn parse(output: &str) -> Option<Self> {
        let regex = DESCRIBE_WITH_TAG.as_ref()?;
        let captures = regex.captures(output.trim())?;
        Some(Self {
            last_tag_name: captures.get(1)?.as_str().to_string(),
            last_version: captures.get(2)?.as_str().to_string(),
            ref_count: captures.get(3)?.as_str().parse().ok()?,
            sha: captures.get(4)?.as_str().to_string(),
            is_dirty: captures.get(5).is_some(),
        })
    }
}

/// Source of repository history for change detection.
pub trait ChangeOracle {
    /// Describe HEAD relative to the last tag, or `None` if nothing is tagged.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository cannot be queried.
    fn describe(&self, include_merged_tags: bool) -> Result<Option<DescribeRef>>;

    /// Files under `location` that differ from `committish`, relative to the
    /// repository root.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository cannot be queried.
    fn changed_files_since(&self, committish: &str, location: &Path) -> Result<Vec<String>>;
}

/// [`ChangeOracle`] backed by the `git` executable.
#[derive(Debug, Clone)]
pub struct GitOracle {
    cwd: PathBuf,
    tag_match: Option<String>,
}

impl GitOracle {
    /// Run git in `cwd`.
    #[must_use]
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            tag_match: None,
        }
    }

    /// Only consider tags matching `pattern` (passed to `git describe --match`).
    #[must_use]
    pub fn with_tag_match(mut self, pattern: impl Into<String>) -> Self {
        self.tag_match = Some(pattern.into());
        self
    }

    /// Directory git runs in.
    #[must_use]
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    fn git(&self, args: &[&str]) -> Result<String> {
        trace!(cwd = %self.cwd.display(), ?args, "Running git");
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.cwd)
            .output()
            .map_err(|source| Error::Spawn {
                source,
                cwd: self.cwd.clone(),
            })?;

        if !output.status.success() {
            return Err(Error::git(
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn has_tags(&self) -> Result<bool> {
        let tags = self.git(&["tag", "--list"])?;
        Ok(tags.lines().any(|line| !line.trim().is_empty()))
    }
}

impl ChangeOracle for GitOracle {
    fn describe(&self, include_merged_tags: bool) -> Result<Option<DescribeRef>> {
        if !self.has_tags()? {
            debug!("No tags found");
            return Ok(None);
        }

        let mut args = vec!["describe", "--always", "--long", "--dirty"];
        if !include_merged_tags {
            args.push("--first-parent");
        }
        if let Some(pattern) = &self.tag_match {
            args.push("--match");
            args.push(pattern);
        }

        let output = self.git(&args)?;
        let described = DescribeRef::parse(&output);
        debug!(output = %output.trim(), ?described, "Described HEAD");
        Ok(described)
    }

    fn changed_files_since(&self, committish: &str, location: &Path) -> Result<Vec<String>> {
        let relative = location
            .strip_prefix(&self.cwd)
            .unwrap_or(location)
            .to_string_lossy()
            .replace('\\', "/");

        let mut args = vec!["diff", "--name-only", committish];
        if !relative.is_empty() {
            args.push("--");
            args.push(&relative);
        }

        let output = self.git(&args)?;
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fixed_tag() {
        let described = DescribeRef::parse("v1.2.0-3-gdeadbee\n").unwrap();
        assert_eq!(described.last_tag_name, "v1.2.0");
        assert_eq!(described.last_version, "v1.2.0");
        assert_eq!(described.ref_count, 3);
        assert_eq!(described.sha, "deadbee");
        assert!(!described.is_dirty);
    }

    #[test]
    fn test_parse_independent_tag() {
        let described = DescribeRef::parse("@scope/pkg-a@2.0.0-beta.1-0-gabc1234-dirty").unwrap();
        assert_eq!(described.last_tag_name, "@scope/pkg-a@2.0.0-beta.1");
        assert_eq!(described.last_version, "2.0.0-beta.1");
        assert_eq!(described.ref_count, 0);
        assert_eq!(described.sha, "abc1234");
        assert!(described.is_dirty);
    }

    #[test]
    fn test_parse_without_tag() {
        assert!(DescribeRef::parse("abc1234").is_none());
        assert!(DescribeRef::parse("abc1234-dirty").is_none());
        assert!(DescribeRef::parse("").is_none());
    }

    #[test]
    fn test_git_outside_repository_fails() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = GitOracle::new(dir.path());
        let err = oracle.changed_files_since("HEAD", dir.path()).unwrap_err();
        assert_eq!(err.code(), "EGIT");
    }
}
