//! Discovery tests against real directory trees.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use monorail_workspace::{Error, ProjectConfig, discover_packages};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_manifest(dir: &Path, body: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join("package.json"), body).unwrap();
}

#[test]
fn discovers_packages_from_default_globs() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    write_manifest(&root.join("packages/b"), r#"{"name": "b", "version": "1.0.0"}"#);
    write_manifest(
        &root.join("packages/a"),
        r#"{"name": "a", "version": "1.0.0", "dependencies": {"b": "^1.0.0"}}"#,
    );
    fs::create_dir_all(root.join("packages/empty")).unwrap();

    let packages = discover_packages(root, &ProjectConfig::default()).unwrap();

    let names: Vec<&str> = packages.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b"], "sorted by location, empty dir skipped");
    assert_eq!(packages[0].dependencies["b"], "^1.0.0");
    assert_eq!(packages[0].location, root.join("packages/a"));
}

#[test]
fn discovers_packages_from_workspaces_field() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    fs::write(
        root.join("monorail.json"),
        r#"{ "useWorkspaces": true }"#,
    )
    .unwrap();
    fs::write(
        root.join("package.json"),
        r#"{ "name": "root", "private": true, "workspaces": ["modules/*", "!modules/legacy"] }"#,
    )
    .unwrap();
    write_manifest(&root.join("modules/core"), r#"{"name": "core", "version": "2.0.0"}"#);
    write_manifest(&root.join("modules/legacy"), r#"{"name": "legacy", "version": "0.1.0"}"#);
    write_manifest(&root.join("packages/ignored"), r#"{"name": "ignored"}"#);

    let config = ProjectConfig::load(root).unwrap();
    let packages = discover_packages(root, &config).unwrap();

    let names: Vec<&str> = packages.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["core"]);
}

#[test]
fn duplicate_names_are_left_for_the_graph() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    write_manifest(&root.join("packages/one"), r#"{"name": "dup"}"#);
    write_manifest(&root.join("packages/two"), r#"{"name": "dup"}"#);

    let packages = discover_packages(root, &ProjectConfig::default()).unwrap();
    assert_eq!(packages.len(), 2);
}

#[test]
fn malformed_manifest_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    write_manifest(&root.join("packages/broken"), "{ nope");

    let result = discover_packages(root, &ProjectConfig::default());
    assert!(matches!(result, Err(Error::Json { .. })));
}

#[test]
fn nameless_manifest_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    write_manifest(&root.join("packages/anon"), r#"{"version": "1.0.0"}"#);

    let err = discover_packages(root, &ProjectConfig::default()).unwrap_err();
    assert_eq!(err.code(), "EMANIFEST");
}
