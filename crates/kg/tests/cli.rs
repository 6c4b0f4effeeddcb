//! End-to-end tests for the `kg` binary against a fixture workspace.

// Integration tests have relaxed clippy settings for test ergonomics.
// Production code (src/) must use strict zero-unwrap/panic patterns.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::too_many_lines,
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// A workspace with two members and one installed blueprint plugin.
fn fixture() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    write(
        &root.join("package.json"),
        r#"{
            "name": "fixture",
            "private": true,
            "dependencies": { "@acme/blueprints": "1.0.0" },
            "kg": { "root": true }
        }"#,
    );
    write(
        &root.join("packages/ui/package.json"),
        r#"{ "name": "@acme/ui", "version": "1.0.0" }"#,
    );
    write(&root.join("apps/web/package.json"), r#"{ "name": "web-app" }"#);

    let plugin = root.join("node_modules/@acme/blueprints");
    write(
        &plugin.join("package.json"),
        r#"{ "name": "@acme/blueprints", "version": "1.0.0" }"#,
    );
    write(
        &plugin.join("kg.json"),
        r#"{
            "name": "acme-blueprints",
            "blueprints": {
                "resolverEntryPoint": "kg::copy",
                "packages": { "library": "templates/library" }
            }
        }"#,
    );
    write(
        &plugin.join("templates/library/package.json"),
        "{ \"name\": \"{{name}}\", \"version\": \"0.1.0\" }\n",
    );
    write(&plugin.join("templates/library/src/__name__.ts"), "export {};\n");

    dir
}

fn kg(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("kg").unwrap();
    cmd.current_dir(dir)
        .env("XDG_CONFIG_HOME", dir.join(".xdg"))
        .env_remove("RUST_LOG")
        .env_remove("KG_MANIFEST_FILE")
        .env_remove("KG_PACKAGE_MANIFEST")
        .env_remove("KG_DISCOVERY_CONCURRENCY")
        .env_remove("KG_MEMBER_SEARCH_DEPTH")
        .env_remove("KG_ROOT_SEARCH");
    cmd
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_packages_lists_members() {
    let dir = fixture();
    kg(dir.path())
        .arg("packages")
        .assert()
        .success()
        .stdout(predicate::str::contains("Acme.Ui"))
        .stdout(predicate::str::contains("Web.App"))
        .stdout(predicate::str::contains("fixture").not());
}

#[test]
fn test_packages_json_sorted_by_id() {
    let dir = fixture();
    let output = kg(dir.path()).args(["packages", "--json"]).output().unwrap();
    assert!(output.status.success());

    let rows: Value = serde_json::from_slice(&output.stdout).unwrap();
    let ids: Vec<&str> = rows
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|row| row["id"].as_str())
        .collect();
    assert_eq!(ids, ["Acme.Ui", "Web.App"]);
}

#[test]
fn test_root_found_from_nested_directory() {
    let dir = fixture();
    kg(&dir.path().join("apps/web"))
        .args(["packages", "-p", "acme.ui"])
        .assert()
        .success()
        .stdout(predicate::str::contains("packages/ui"));
}

#[test]
fn test_directory_flag() {
    let dir = fixture();
    let elsewhere = tempfile::tempdir().unwrap();
    kg(elsewhere.path())
        .arg("-C")
        .arg(dir.path())
        .arg("packages")
        .assert()
        .success()
        .stdout(predicate::str::contains("Web.App"));
}

#[test]
fn test_unknown_command_exit_code() {
    let dir = fixture();
    kg(dir.path())
        .arg("deploy")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Command not found: 'deploy'"));
}

#[test]
fn test_no_command_fails() {
    let dir = fixture();
    kg(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Command not found"));
}

#[test]
fn test_unknown_parameter_exit_code() {
    let dir = fixture();
    kg(dir.path())
        .args(["packages", "--bogus"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unknown parameter: '--bogus'"));
}

#[test]
fn test_unknown_package_exit_code() {
    let dir = fixture();
    kg(dir.path())
        .args(["packages", "--package", "nope"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Package not found: 'nope'"));
}

#[test]
fn test_config_of_command_without_configuration() {
    let dir = fixture();
    kg(dir.path())
        .args(["config", "packages"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("does not declare a configuration"));
}

#[test]
fn test_config_shows_defaults() {
    let dir = fixture();
    kg(dir.path())
        .args(["config", "create", "into"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"packages\""));
}

#[test]
fn test_config_set_persists_into_package_manifest() {
    let dir = fixture();
    kg(dir.path())
        .args(["config", "create", "into", "--set=apps", "-p", "web-app"])
        .assert()
        .success();

    let manifest_path = dir.path().join("apps/web/package.json");
    let manifest = read_json(&manifest_path);
    assert_eq!(manifest["kg"]["config"]["create"]["into"], "apps");
    assert_eq!(manifest["name"], "web-app");

    let content = fs::read_to_string(&manifest_path).unwrap();
    assert!(content.ends_with("}\n"));
    assert!(content.find("\"name\"").unwrap() < content.find("\"kg\"").unwrap());

    kg(dir.path())
        .args(["config", "create", "-p", "Web.App"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"apps\""));
}

#[test]
fn test_config_set_without_package_asks_for_package_flag() {
    let dir = fixture();
    kg(dir.path())
        .args(["config", "create", "into", "--set=apps"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("pass --package <id> or --all"))
        .stderr(predicate::str::contains("Missing required parameter").not());

    let manifest = read_json(&dir.path().join("apps/web/package.json"));
    assert!(manifest.get("kg").is_none());
}

#[test]
fn test_create_copies_blueprint() {
    let dir = fixture();
    kg(dir.path())
        .args(["create", "library", "my-lib"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created my-lib"));

    let created = dir.path().join("packages/my-lib");
    assert_eq!(read_json(&created.join("package.json"))["name"], "my-lib");
    assert!(created.join("src/my-lib.ts").is_file());

    kg(dir.path())
        .args(["create", "library", "my-lib"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_create_into_flag() {
    let dir = fixture();
    kg(dir.path())
        .args(["create", "library", "tools", "--into", "apps"])
        .assert()
        .success();
    assert!(dir.path().join("apps/tools/package.json").is_file());
}

#[test]
fn test_create_unknown_blueprint() {
    let dir = fixture();
    kg(dir.path())
        .args(["create", "service", "api"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Blueprint not found: 'service'"));
}

#[test]
fn test_missing_required_parameter() {
    let dir = fixture();
    kg(dir.path())
        .args(["create", "library"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Missing required parameter: <name>"));
}
