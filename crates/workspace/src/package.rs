//! Normalized view of a single package manifest (`package.json`).

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// File name of a package manifest.
pub const MANIFEST_FILE_NAME: &str = "package.json";

/// Map of dependency name to its raw version specifier.
pub type DependencyMap = BTreeMap<String, String>;

/// One package of the repository.
///
/// Packages are read-only inputs to the dependency graph. The dependency maps
/// hold raw specifier strings exactly as written in the manifest.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    /// Package name, unique within a repository.
    pub name: String,
    /// Semantic version string, if the manifest declares one.
    pub version: Option<String>,
    /// Directory containing the manifest.
    pub location: PathBuf,
    /// Path of the manifest file itself.
    pub manifest_location: PathBuf,
    /// Whether the manifest is marked `"private": true`.
    pub private: bool,
    /// Regular `dependencies`.
    pub dependencies: DependencyMap,
    /// `devDependencies`.
    pub dev_dependencies: DependencyMap,
    /// `optionalDependencies`.
    pub optional_dependencies: DependencyMap,
    /// `peerDependencies`.
    pub peer_dependencies: DependencyMap,
    /// The untouched manifest JSON, when the package was read from one.
    #[serde(skip)]
    pub raw: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestFields {
    name: Option<String>,
    version: Option<String>,
    #[serde(default)]
    private: bool,
    #[serde(default)]
    dependencies: Option<DependencyMap>,
    #[serde(default)]
    dev_dependencies: Option<DependencyMap>,
    #[serde(default)]
    optional_dependencies: Option<DependencyMap>,
    #[serde(default)]
    peer_dependencies: Option<DependencyMap>,
}

impl Package {
    /// Create a package without any dependencies.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        location: impl Into<PathBuf>,
    ) -> Self {
        let location = location.into();
        Self {
            name: name.into(),
            version: Some(version.into()),
            manifest_location: location.join(MANIFEST_FILE_NAME),
            location,
            private: false,
            dependencies: DependencyMap::new(),
            dev_dependencies: DependencyMap::new(),
            optional_dependencies: DependencyMap::new(),
            peer_dependencies: DependencyMap::new(),
            raw: None,
        }
    }

    /// Add a regular dependency.
    #[must_use]
    pub fn with_dependency(mut self, name: impl Into<String>, spec: impl Into<String>) -> Self {
        self.dependencies.insert(name.into(), spec.into());
        self
    }

    /// Add a dev dependency.
    #[must_use]
    pub fn with_dev_dependency(mut self, name: impl Into<String>, spec: impl Into<String>) -> Self {
        self.dev_dependencies.insert(name.into(), spec.into());
        self
    }

    /// Add an optional dependency.
    #[must_use]
    pub fn with_optional_dependency(
        mut self,
        name: impl Into<String>,
        spec: impl Into<String>,
    ) -> Self {
        self.optional_dependencies.insert(name.into(), spec.into());
        self
    }

    /// Add a peer dependency.
    #[must_use]
    pub fn with_peer_dependency(
        mut self,
        name: impl Into<String>,
        spec: impl Into<String>,
    ) -> Self {
        self.peer_dependencies.insert(name.into(), spec.into());
        self
    }

    /// Mark the package as private.
    #[must_use]
    pub const fn with_private(mut self, private: bool) -> Self {
        self.private = private;
        self
    }

    /// Drop the version, as for manifests that do not declare one.
    #[must_use]
    pub fn without_version(mut self) -> Self {
        self.version = None;
        self
    }

    /// Read and parse a `package.json` file.
    ///
    /// The package location is the directory containing the manifest.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist, cannot be read, is not
    /// valid JSON, or lacks a `name`.
    pub fn from_manifest(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::ManifestNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path).map_err(|source| Error::Io {
            source,
            path: Some(path.to_path_buf()),
            operation: "reading package manifest".to_string(),
        })?;

        let value: Value = serde_json::from_str(&content).map_err(|source| Error::Json {
            source,
            path: Some(path.to_path_buf()),
        })?;

        let location = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let mut package = Self::from_value(value, location)?;
        package.manifest_location = path.to_path_buf();
        Ok(package)
    }

    /// Build a package from already-parsed manifest JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest has the wrong shape or lacks a `name`.
    pub fn from_value(value: Value, location: impl Into<PathBuf>) -> Result<Self> {
        let location = location.into();
        let manifest_location = location.join(MANIFEST_FILE_NAME);

        let fields: ManifestFields = serde_json::from_value(value.clone())
            .map_err(|e| Error::invalid_manifest(&manifest_location, e.to_string()))?;

        let name = fields
            .name
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| Error::invalid_manifest(&manifest_location, "missing \"name\" field"))?;

        Ok(Self {
            name,
            version: fields.version,
            location,
            manifest_location,
            private: fields.private,
            dependencies: fields.dependencies.unwrap_or_default(),
            dev_dependencies: fields.dev_dependencies.unwrap_or_default(),
            optional_dependencies: fields.optional_dependencies.unwrap_or_default(),
            peer_dependencies: fields.peer_dependencies.unwrap_or_default(),
            raw: Some(value),
        })
    }

    /// Look up a dependency specifier across every dependency map.
    ///
    /// Regular dependencies win over optional, dev and peer entries.
    #[must_use]
    pub fn get_dependency(&self, name: &str) -> Option<&str> {
        self.dependencies
            .get(name)
            .or_else(|| self.optional_dependencies.get(name))
            .or_else(|| self.dev_dependencies.get(name))
            .or_else(|| self.peer_dependencies.get(name))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_from_value_reads_all_dependency_maps() {
        let manifest = json!({
            "name": "@scope/app",
            "version": "1.2.3",
            "private": true,
            "dependencies": { "left-pad": "^1.0.0" },
            "devDependencies": { "jest": "^29.0.0" },
            "optionalDependencies": { "fsevents": "*" },
            "peerDependencies": { "react": ">=18" }
        });

        let package = Package::from_value(manifest, "/repo/packages/app").unwrap();

        assert_eq!(package.name, "@scope/app");
        assert_eq!(package.version.as_deref(), Some("1.2.3"));
        assert!(package.private);
        assert_eq!(package.dependencies["left-pad"], "^1.0.0");
        assert_eq!(package.dev_dependencies["jest"], "^29.0.0");
        assert_eq!(package.optional_dependencies["fsevents"], "*");
        assert_eq!(package.peer_dependencies["react"], ">=18");
        assert_eq!(
            package.manifest_location,
            PathBuf::from("/repo/packages/app/package.json")
        );
        assert!(package.raw.is_some());
    }

    #[test]
    fn test_from_value_missing_name() {
        let result = Package::from_value(json!({ "version": "1.0.0" }), "/repo/x");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("missing \"name\""));
    }

    #[test]
    fn test_from_value_null_dependency_map() {
        let package =
            Package::from_value(json!({ "name": "a", "dependencies": null }), "/repo/a").unwrap();
        assert!(package.dependencies.is_empty());
        assert!(package.version.is_none());
    }

    #[test]
    fn test_from_value_rejects_non_string_specifiers() {
        let result = Package::from_value(json!({ "name": "a", "dependencies": { "b": 1 } }), "/a");
        assert!(result.is_err());
    }

    #[test]
    fn test_from_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let manifest = temp_dir.path().join("package.json");
        fs::write(&manifest, r#"{"name": "pkg", "version": "0.1.0"}"#).unwrap();

        let package = Package::from_manifest(&manifest).unwrap();
        assert_eq!(package.name, "pkg");
        assert_eq!(package.location, temp_dir.path());
        assert_eq!(package.manifest_location, manifest);
    }

    #[test]
    fn test_from_manifest_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = Package::from_manifest(&temp_dir.path().join("package.json"));
        assert!(matches!(result, Err(Error::ManifestNotFound { .. })));
    }

    #[test]
    fn test_from_manifest_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        let manifest = temp_dir.path().join("package.json");
        fs::write(&manifest, "{ not json").unwrap();

        let result = Package::from_manifest(&manifest);
        assert!(matches!(result, Err(Error::Json { path: Some(_), .. })));
    }

    #[test]
    fn test_builder_and_get_dependency() {
        let package = Package::new("a", "1.0.0", "/repo/a")
            .with_dependency("b", "^1.0.0")
            .with_dev_dependency("b", "^2.0.0")
            .with_peer_dependency("c", "^3.0.0");

        assert_eq!(package.get_dependency("b"), Some("^1.0.0"));
        assert_eq!(package.get_dependency("c"), Some("^3.0.0"));
        assert_eq!(package.get_dependency("d"), None);
    }
}
