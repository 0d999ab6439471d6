//! Dependency specifier resolution.
//!
//! Turns the raw right-hand side of a manifest dependency entry (`^1.2.3`,
//! `file:../foo`, `workspace:*`, `github:user/repo#v1.0.0`, ...) into a
//! [`ResolvedSpec`]. Resolution is pure string and path manipulation; it never
//! touches the filesystem or the network.

use crate::error::{Error, Result};
use crate::range::{is_valid_range, parse_version};
use serde::Serialize;
use std::fmt;
use std::path::{Component, Path, PathBuf};

const TARBALL_EXTENSIONS: [&str; 3] = [".tgz", ".tar.gz", ".tar"];
const HOSTED_PROVIDERS: [(&str, &str); 4] = [
    ("github", "github.com"),
    ("gitlab", "gitlab.com"),
    ("bitbucket", "bitbucket.org"),
    ("gist", "gist.github.com"),
];

/// The syntactic category of a dependency specifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SpecKind {
    /// A semver range such as `^1.2.3` or `>=1 <2`.
    Range,
    /// An exact version such as `1.2.3`.
    Version,
    /// A dist-tag such as `latest`.
    Tag,
    /// A local directory (`file:../foo`, `../foo`).
    Directory,
    /// A local tarball (`file:../foo.tgz`).
    File,
    /// A git URL.
    Git,
    /// A hosted git shorthand (`github:user/repo`, `user/repo`).
    HostedShorthand,
    /// A `workspace:` protocol reference.
    Workspace,
    /// A remote tarball URL.
    Remote,
    /// An `npm:<name>@<spec>` alias.
    Alias,
}

impl fmt::Display for SpecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Range => "range",
            Self::Version => "version",
            Self::Tag => "tag",
            Self::Directory => "directory",
            Self::File => "file",
            Self::Git => "git",
            Self::HostedShorthand => "hosted",
            Self::Workspace => "workspace",
            Self::Remote => "remote",
            Self::Alias => "alias",
        };
        f.write_str(name)
    }
}

/// The alias form of a `workspace:` specifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WorkspaceAlias {
    /// `workspace:*`
    #[serde(rename = "*")]
    Star,
    /// `workspace:^`
    #[serde(rename = "^")]
    Caret,
    /// `workspace:~`
    #[serde(rename = "~")]
    Tilde,
}

impl WorkspaceAlias {
    fn parse(spec: &str) -> Option<Self> {
        match spec {
            "*" => Some(Self::Star),
            "^" => Some(Self::Caret),
            "~" => Some(Self::Tilde),
            _ => None,
        }
    }

    /// Expand the alias against the sibling's version.
    #[must_use]
    pub fn expand(self, version: Option<&str>) -> String {
        match (self, version) {
            (_, None) => "*".to_string(),
            (Self::Star, Some(version)) => version.to_string(),
            (Self::Caret, Some(version)) => format!("^{version}"),
            (Self::Tilde, Some(version)) => format!("~{version}"),
        }
    }
}

/// Repository coordinates of a hosted git dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostedRepo {
    /// Provider key, e.g. `github`.
    pub provider: String,
    /// Owning user or organisation.
    pub user: String,
    /// Repository name without a `.git` suffix.
    pub project: String,
}

/// A parsed dependency specifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSpec {
    /// Dependency name.
    pub name: String,
    /// The specifier exactly as written in the manifest.
    pub raw_spec: String,
    /// Specifier category.
    pub kind: SpecKind,
    /// Normalized comparison target: a range, version, tag, absolute path or URL.
    pub fetch_spec: String,
    /// Git ref after `#`, unless it was a `semver:` range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_committish: Option<String>,
    /// Range from a `#semver:<range>` git fragment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_range: Option<String>,
    /// Hosted repository coordinates for hosted git specifiers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hosted: Option<HostedRepo>,
    /// The aliased target of an `npm:` specifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias_of: Option<Box<ResolvedSpec>>,
    /// The full `workspace:` specifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_spec: Option<String>,
    /// The alias of a `workspace:` specifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_alias: Option<WorkspaceAlias>,
}

impl ResolvedSpec {
    fn new(name: &str, raw_spec: &str, kind: SpecKind, fetch_spec: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            raw_spec: raw_spec.to_string(),
            kind,
            fetch_spec: fetch_spec.into(),
            git_committish: None,
            git_range: None,
            hosted: None,
            alias_of: None,
            workspace_spec: None,
            workspace_alias: None,
        }
    }

    /// Whether the specifier is a `workspace:` reference.
    #[must_use]
    pub const fn is_workspace(&self) -> bool {
        matches!(self.kind, SpecKind::Workspace)
    }

    /// Whether the specifier points at a path on disk.
    #[must_use]
    pub const fn is_local_path(&self) -> bool {
        matches!(self.kind, SpecKind::Directory | SpecKind::File)
    }

    /// Whether the specifier is a git reference, hosted or not.
    #[must_use]
    pub const fn is_git(&self) -> bool {
        matches!(self.kind, SpecKind::Git | SpecKind::HostedShorthand)
    }

    /// The string a sibling version is tested against: the git committish,
    /// else the git `semver:` range, else the fetch spec.
    #[must_use]
    pub fn version_target(&self) -> &str {
        self.git_committish
            .as_deref()
            .or(self.git_range.as_deref())
            .unwrap_or(&self.fetch_spec)
    }
}

impl fmt::Display for ResolvedSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.raw_spec)
    }
}

/// Resolve a dependency specifier declared by the package at `location`.
///
/// `sibling_version` is the version of the same-named sibling package, if
/// any; it is used only to expand `workspace:` aliases.
///
/// # Errors
///
/// Returns [`Error::UnresolvableSpecifier`] when the specifier is not a
/// version, range, tag, path, URL or any other recognised form.
pub fn resolve(
    name: &str,
    raw_spec: &str,
    location: &Path,
    sibling_version: Option<&str>,
) -> Result<ResolvedSpec> {
    let spec = raw_spec.trim();
    let spec = match spec.strip_prefix("link:") {
        Some(rest) => format!("file:{rest}"),
        None => spec.to_string(),
    };

    if let Some(rest) = spec.strip_prefix("workspace:") {
        return resolve_workspace(name, raw_spec, rest, location, sibling_version);
    }

    resolve_inner(name, raw_spec, &spec, location)
}

fn resolve_workspace(
    name: &str,
    raw_spec: &str,
    rest: &str,
    location: &Path,
    sibling_version: Option<&str>,
) -> Result<ResolvedSpec> {
    let alias = WorkspaceAlias::parse(rest.trim());
    let target = match alias {
        Some(alias) => alias.expand(sibling_version),
        None => rest.trim().to_string(),
    };

    let inner = resolve_inner(name, raw_spec, &target, location)?;
    Ok(ResolvedSpec {
        kind: SpecKind::Workspace,
        workspace_spec: Some(raw_spec.trim().to_string()),
        workspace_alias: alias,
        ..inner
    })
}

fn resolve_inner(
    name: &str,
    raw_spec: &str,
    spec: &str,
    location: &Path,
) -> Result<ResolvedSpec> {
    if let Some(path) = spec.strip_prefix("file:") {
        let path = path.strip_prefix("//").unwrap_or(path);
        return Ok(from_path(name, raw_spec, path, location));
    }

    if is_path_like(spec) {
        return Ok(from_path(name, raw_spec, spec, location));
    }

    if let Some(aliased) = spec.strip_prefix("npm:") {
        return resolve_alias(name, raw_spec, aliased, location);
    }

    if let Some(resolved) = from_hosted_shorthand(name, raw_spec, spec) {
        return Ok(resolved);
    }

    if let Some(resolved) = from_url(name, raw_spec, spec) {
        return Ok(resolved);
    }

    if spec.contains('/') || is_tarball(spec) {
        return Ok(from_path(name, raw_spec, spec, location));
    }

    from_registry(name, raw_spec, spec)
}

fn resolve_alias(
    name: &str,
    raw_spec: &str,
    aliased: &str,
    location: &Path,
) -> Result<ResolvedSpec> {
    // The name may itself be scoped, so the version separator is the last `@`
    // that is not the first character.
    let (target_name, target_spec) = match aliased.rfind('@') {
        Some(at) if at > 0 => (&aliased[..at], &aliased[at + 1..]),
        _ => (aliased, ""),
    };

    if target_name.is_empty() {
        return Err(Error::unresolvable(name, raw_spec, "npm: alias without a package name"));
    }

    let target = resolve_inner(target_name, target_spec, target_spec, location)?;
    if !matches!(target.kind, SpecKind::Range | SpecKind::Version | SpecKind::Tag) {
        return Err(Error::unresolvable(
            name,
            raw_spec,
            "npm: aliases may only point at registry specifiers",
        ));
    }

    let mut resolved =
        ResolvedSpec::new(name, raw_spec, SpecKind::Alias, target.fetch_spec.clone());
    resolved.alias_of = Some(Box::new(target));
    Ok(resolved)
}

fn from_registry(name: &str, raw_spec: &str, spec: &str) -> Result<ResolvedSpec> {
    if spec.is_empty() {
        return Ok(ResolvedSpec::new(name, raw_spec, SpecKind::Range, "*"));
    }

    if parse_version(spec).is_some() {
        return Ok(ResolvedSpec::new(name, raw_spec, SpecKind::Version, spec));
    }

    if is_valid_range(spec) {
        return Ok(ResolvedSpec::new(name, raw_spec, SpecKind::Range, spec));
    }

    if spec.chars().all(is_unreserved) {
        return Ok(ResolvedSpec::new(name, raw_spec, SpecKind::Tag, spec));
    }

    Err(Error::unresolvable(
        name,
        raw_spec,
        "not a valid version, range or tag name",
    ))
}

const fn is_unreserved(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '!' | '~' | '*' | '\'' | '(' | ')')
}

fn is_tarball(spec: &str) -> bool {
    TARBALL_EXTENSIONS.iter().any(|ext| spec.ends_with(ext))
}

fn is_path_like(spec: &str) -> bool {
    let bytes = spec.as_bytes();
    spec.starts_with('.')
        || spec.starts_with('/')
        || spec.starts_with('\\')
        || spec.starts_with("~/")
        || (bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':')
}

fn from_path(name: &str, raw_spec: &str, path: &str, location: &Path) -> ResolvedSpec {
    let kind = if is_tarball(path) {
        SpecKind::File
    } else {
        SpecKind::Directory
    };

    // Home-relative paths stay unexpanded.
    if path.starts_with("~/") {
        return ResolvedSpec::new(name, raw_spec, kind, path);
    }

    let absolute = normalize_path(&location.join(path));
    ResolvedSpec::new(name, raw_spec, kind, absolute.to_string_lossy())
}

/// Split `spec#fragment` and record the fragment as a committish or range.
fn apply_fragment(resolved: &mut ResolvedSpec, fragment: Option<&str>) {
    match fragment {
        Some(fragment) if !fragment.is_empty() => {
            if let Some(range) = fragment.strip_prefix("semver:") {
                resolved.git_range = Some(range.to_string());
            } else {
                resolved.git_committish = Some(fragment.to_string());
            }
        }
        _ => {}
    }
}

fn from_hosted_shorthand(name: &str, raw_spec: &str, spec: &str) -> Option<ResolvedSpec> {
    let (body, fragment) = split_fragment(spec);

    let (provider, path) = HOSTED_PROVIDERS
        .iter()
        .find_map(|(provider, _)| {
            body.strip_prefix(provider)
                .and_then(|rest| rest.strip_prefix(':'))
                .map(|rest| (*provider, rest))
        })
        .or_else(|| is_bare_shorthand(body).then_some(("github", body)))?;

    let (user, project) = path.split_once('/')?;
    let project = project.strip_suffix(".git").unwrap_or(project);
    if user.is_empty() || project.is_empty() || project.contains('/') {
        return None;
    }

    let mut resolved = ResolvedSpec::new(
        name,
        raw_spec,
        SpecKind::HostedShorthand,
        format!("{provider}:{user}/{project}"),
    );
    resolved.hosted = Some(HostedRepo {
        provider: provider.to_string(),
        user: user.to_string(),
        project: project.to_string(),
    });
    apply_fragment(&mut resolved, fragment);
    Some(resolved)
}

/// `user/repo` with no scheme, scope, or path-like prefix.
fn is_bare_shorthand(spec: &str) -> bool {
    let Some((user, project)) = spec.split_once('/') else {
        return false;
    };
    let first = user.chars().next();
    !user.is_empty()
        && !project.is_empty()
        && !matches!(first, Some('@' | '.' | '-' | '%'))
        && !user.contains([':', '@', '%'])
        && !project.contains(['/', '@', '%'])
        && !spec.contains(char::is_whitespace)
        && !is_tarball(project)
}

fn split_fragment(spec: &str) -> (&str, Option<&str>) {
    match spec.split_once('#') {
        Some((body, fragment)) => (body, Some(fragment)),
        None => (spec, None),
    }
}

fn from_url(name: &str, raw_spec: &str, spec: &str) -> Option<ResolvedSpec> {
    let (body, fragment) = split_fragment(spec);

    let is_git = body.starts_with("git+")
        || body.starts_with("git://")
        || body.starts_with("ssh://")
        || is_scp_like(body)
        || (is_http(body) && body.ends_with(".git"));

    if is_git {
        let fetch = body.strip_prefix("git+").unwrap_or(body);
        let mut resolved = ResolvedSpec::new(name, raw_spec, SpecKind::Git, fetch);
        resolved.hosted = hosted_from_url(fetch);
        apply_fragment(&mut resolved, fragment);
        return Some(resolved);
    }

    if is_http(body) {
        if let Some(hosted) = hosted_from_url(body) {
            let mut resolved = ResolvedSpec::new(name, raw_spec, SpecKind::Git, body);
            resolved.hosted = Some(hosted);
            apply_fragment(&mut resolved, fragment);
            return Some(resolved);
        }
        return Some(ResolvedSpec::new(name, raw_spec, SpecKind::Remote, spec));
    }

    None
}

fn is_http(spec: &str) -> bool {
    spec.starts_with("http://") || spec.starts_with("https://")
}

/// `git@host:user/repo.git`
fn is_scp_like(spec: &str) -> bool {
    spec.split_once('@').is_some_and(|(user, rest)| {
        !user.is_empty() && !user.contains(['/', ':']) && rest.contains(':') && !rest.contains("://")
    })
}

/// Recognise `github.com/user/repo` style URLs of the known providers.
fn hosted_from_url(url: &str) -> Option<HostedRepo> {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let without_user = without_scheme
        .split_once('@')
        .map_or(without_scheme, |(_, rest)| rest);
    let (host, path) = without_user.split_once(['/', ':'])?;

    let provider = HOSTED_PROVIDERS
        .iter()
        .find(|(_, domain)| host == *domain)
        .map(|(provider, _)| *provider)?;

    let mut segments = path.trim_end_matches('/').split('/');
    let user = segments.next()?;
    let project = segments.next()?;
    if segments.next().is_some() || user.is_empty() || project.is_empty() {
        return None;
    }

    Some(HostedRepo {
        provider: provider.to_string(),
        user: user.to_string(),
        project: project.strip_suffix(".git").unwrap_or(project).to_string(),
    })
}

/// Lexically normalize a path: drop `.` components and resolve `..` against
/// the preceding component. No filesystem access takes place.
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve_at(spec: &str) -> ResolvedSpec {
        resolve("dep", spec, Path::new("/repo/packages/app"), None).unwrap()
    }

    #[test]
    fn test_registry_specs() {
        let range = resolve_at("^1.2.3");
        assert_eq!(range.kind, SpecKind::Range);
        assert_eq!(range.fetch_spec, "^1.2.3");

        let version = resolve_at("1.2.3");
        assert_eq!(version.kind, SpecKind::Version);

        let tag = resolve_at("latest");
        assert_eq!(tag.kind, SpecKind::Tag);
        assert_eq!(tag.fetch_spec, "latest");

        let any = resolve_at("");
        assert_eq!(any.kind, SpecKind::Range);
        assert_eq!(any.fetch_spec, "*");
    }

    #[test]
    fn test_unresolvable_spec() {
        let err = resolve("dep", "not a tag!", Path::new("/repo"), None).unwrap_err();
        assert_eq!(err.code(), "ESPEC");
    }

    #[test]
    fn test_directory_specs_resolve_to_absolute_paths() {
        let file = resolve_at("file:../lib");
        assert_eq!(file.kind, SpecKind::Directory);
        assert_eq!(file.fetch_spec, "/repo/packages/lib");

        let relative = resolve_at("../lib");
        assert_eq!(relative.fetch_spec, "/repo/packages/lib");

        let link = resolve_at("link:./nested/../sub");
        assert_eq!(link.kind, SpecKind::Directory);
        assert_eq!(link.fetch_spec, "/repo/packages/app/sub");
        assert_eq!(link.raw_spec, "link:./nested/../sub");
    }

    #[test]
    fn test_tarball_specs() {
        let tarball = resolve_at("file:../lib/lib-1.0.0.tgz");
        assert_eq!(tarball.kind, SpecKind::File);
        assert_eq!(tarball.fetch_spec, "/repo/packages/lib/lib-1.0.0.tgz");

        let bare = resolve_at("lib.tar.gz");
        assert_eq!(bare.kind, SpecKind::File);
    }

    #[test]
    fn test_home_relative_path_is_kept_verbatim() {
        let home = resolve_at("~/shared/lib");
        assert_eq!(home.kind, SpecKind::Directory);
        assert_eq!(home.fetch_spec, "~/shared/lib");

        let tarball = resolve_at("file:~/dist/lib-1.0.0.tgz");
        assert_eq!(tarball.kind, SpecKind::File);
        assert_eq!(tarball.fetch_spec, "~/dist/lib-1.0.0.tgz");
    }

    #[test]
    fn test_workspace_aliases() {
        let location = Path::new("/repo/packages/app");

        let star = resolve("dep", "workspace:*", location, Some("1.2.3")).unwrap();
        assert_eq!(star.kind, SpecKind::Workspace);
        assert_eq!(star.fetch_spec, "1.2.3");
        assert_eq!(star.workspace_alias, Some(WorkspaceAlias::Star));
        assert_eq!(star.workspace_spec.as_deref(), Some("workspace:*"));

        let caret = resolve("dep", "workspace:^", location, Some("1.2.3")).unwrap();
        assert_eq!(caret.fetch_spec, "^1.2.3");

        let tilde = resolve("dep", "workspace:~", location, Some("1.2.3")).unwrap();
        assert_eq!(tilde.fetch_spec, "~1.2.3");

        let unknown = resolve("dep", "workspace:^", location, None).unwrap();
        assert_eq!(unknown.fetch_spec, "*");

        let range = resolve("dep", "workspace:^2.0.0", location, Some("1.0.0")).unwrap();
        assert_eq!(range.kind, SpecKind::Workspace);
        assert_eq!(range.fetch_spec, "^2.0.0");
        assert_eq!(range.workspace_alias, None);
    }

    #[test]
    fn test_hosted_shorthand() {
        let github = resolve_at("github:user/repo#v1.0.0");
        assert_eq!(github.kind, SpecKind::HostedShorthand);
        assert_eq!(github.git_committish.as_deref(), Some("v1.0.0"));
        assert_eq!(github.version_target(), "v1.0.0");

        let bare = resolve_at("user/repo#semver:^1.0.0");
        assert_eq!(bare.kind, SpecKind::HostedShorthand);
        assert_eq!(bare.git_range.as_deref(), Some("^1.0.0"));
        assert_eq!(bare.git_committish, None);
        assert_eq!(
            bare.hosted.as_ref().map(|h| h.provider.as_str()),
            Some("github")
        );
    }

    #[test]
    fn test_git_urls() {
        let ssh = resolve_at("git+ssh://git@github.com/user/repo.git#main");
        assert_eq!(ssh.kind, SpecKind::Git);
        assert_eq!(ssh.fetch_spec, "ssh://git@github.com/user/repo.git");
        assert_eq!(ssh.git_committish.as_deref(), Some("main"));
        assert_eq!(ssh.hosted.as_ref().map(|h| h.project.as_str()), Some("repo"));

        let scp = resolve_at("git@gitlab.com:group/proj.git");
        assert_eq!(scp.kind, SpecKind::Git);
        assert_eq!(scp.hosted.as_ref().map(|h| h.provider.as_str()), Some("gitlab"));

        let https = resolve_at("https://example.com/repo.git#semver:~2.1.0");
        assert_eq!(https.kind, SpecKind::Git);
        assert_eq!(https.git_range.as_deref(), Some("~2.1.0"));
    }

    #[test]
    fn test_remote_tarball() {
        let remote = resolve_at("https://registry.example.com/dep/-/dep-1.0.0.tgz");
        assert_eq!(remote.kind, SpecKind::Remote);
    }

    #[test]
    fn test_npm_alias() {
        let alias = resolve_at("npm:@scope/real@^2.0.0");
        assert_eq!(alias.kind, SpecKind::Alias);
        assert_eq!(alias.fetch_spec, "^2.0.0");
        let target = alias.alias_of.unwrap();
        assert_eq!(target.name, "@scope/real");
        assert_eq!(target.kind, SpecKind::Range);
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("/a/b/./c/../d")),
            PathBuf::from("/a/b/d")
        );
        assert_eq!(normalize_path(Path::new("a/../../b")), PathBuf::from("../b"));
    }
}
