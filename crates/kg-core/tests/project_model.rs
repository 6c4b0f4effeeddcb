//! Project model on disk: member listing and configuration persistence.

// Integration tests have relaxed clippy settings for test ergonomics.
// Production code (src/) must use strict zero-unwrap/panic patterns.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

use std::fs;
use std::path::Path;

use kg_core::{
    list_member_packages, merge_defaults, persist_configuration, resolve_configuration,
    ConfigurationDescriptor, PackageHandle, Settings,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn test_member_listing_rules() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(&root.join("package.json"), r#"{"name":"root","kg":{"root":true}}"#);
    write(&root.join("libs/ui/package.json"), r#"{"name":"@acme/ui","version":"2.0.0"}"#);
    write(&root.join("libs/unnamed/package.json"), r#"{"version":"1.0.0"}"#);
    write(&root.join("libs/broken/package.json"), "{ nope");
    write(&root.join("node_modules/dep/package.json"), r#"{"name":"dep"}"#);
    write(&root.join("a/b/c/d/e/deep/package.json"), r#"{"name":"too-deep"}"#);
    write(&root.join("apps/web/package.json"), r#"{"name":"web"}"#);

    let packages = list_member_packages(root, &Settings::default());

    let ids: Vec<&str> = packages.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, ["Acme.Ui", "Web"]);
    assert_eq!(packages[0].version, "2.0.0");
    assert_eq!(packages[1].version, "0.0.0");
    assert_eq!(packages[1].directory, root.join("apps/web"));
}

#[test]
fn test_member_search_depth_setting() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir.path().join("a/b/c/d/e/deep/package.json"), r#"{"name":"deep"}"#);

    let shallow = list_member_packages(dir.path(), &Settings::default());
    assert!(shallow.is_empty());

    let settings = Settings {
        member_search_depth: 6,
        ..Settings::default()
    };
    assert_eq!(list_member_packages(dir.path(), &settings).len(), 1);
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
struct BuildConfig {
    target: String,
    minify: bool,
    #[serde(default)]
    extra: Option<String>,
}

#[tokio::test]
async fn test_persist_then_resolve_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("package.json");
    write(
        &path,
        r#"{"name":"web","version":"1.0.0","scripts":{"start":"node ."}}"#,
    );
    let descriptor = ConfigurationDescriptor::new("build", json!({"target": "node", "minify": false}));

    let mut package = PackageHandle::load(&path).unwrap().unwrap();
    let value = json!({"target": "browser", "extra": "x"});
    persist_configuration(&mut package, &descriptor, &value).await.unwrap();

    let reloaded = PackageHandle::load(&path).unwrap().unwrap();
    let resolved: Value = resolve_configuration(Some(&reloaded), &descriptor).unwrap();

    let mut expected = value.clone();
    merge_defaults(&mut expected, descriptor.defaults());
    assert_eq!(resolved, expected);

    let typed: BuildConfig = resolve_configuration(Some(&reloaded), &descriptor).unwrap();
    assert_eq!(
        typed,
        BuildConfig {
            target: "browser".to_string(),
            minify: false,
            extra: Some("x".to_string()),
        }
    );

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.ends_with('\n'));
    let keys: Vec<String> = serde_json::from_str::<Value>(&content)
        .unwrap()
        .as_object()
        .unwrap()
        .keys()
        .cloned()
        .collect();
    assert_eq!(keys, ["name", "version", "scripts", "kg"]);
}

#[tokio::test]
async fn test_persist_keeps_stored_only_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("package.json");
    write(
        &path,
        r#"{"name":"web","kg":{"config":{"build":{"legacy":1,"target":"node"}}}}"#,
    );
    let descriptor = ConfigurationDescriptor::new("build", json!({"target": "node"}));

    let mut package = PackageHandle::load(&path).unwrap().unwrap();
    persist_configuration(&mut package, &descriptor, &json!({"target": "deno"}))
        .await
        .unwrap();

    let stored = PackageHandle::load(&path).unwrap().unwrap();
    assert_eq!(
        stored.stored_configuration("build"),
        Some(&json!({"legacy": 1, "target": "deno"}))
    );
}

#[test]
fn test_resolve_does_not_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("package.json");
    let original = r#"{"name":"web"}"#;
    write(&path, original);
    let descriptor = ConfigurationDescriptor::new("build", json!({"target": "node"}));

    let package = PackageHandle::load(&path).unwrap().unwrap();
    let _: Value = resolve_configuration(Some(&package), &descriptor).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), original);
    assert!(package.stored_configuration("build").is_none());
}
