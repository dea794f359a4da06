// ABOUTME: Integration tests for the cutover CLI commands.
// ABOUTME: Validates --help output, init behavior, and exit codes for config errors.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn cutover_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("cutover"));
    cmd.env_remove("CUTOVER_CONFIG")
        .env_remove("CUTOVER_ENVIRONMENT")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_shows_commands() {
    cutover_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("rollback"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn deploy_help_lists_gate_flags() {
    cutover_cmd()
        .args(["deploy", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--skip-tests"))
        .stdout(predicate::str::contains("--force"))
        .stdout(predicate::str::contains("--service"));
}

#[test]
fn init_creates_config_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("cutover.yml");

    cutover_cmd()
        .current_dir(temp_dir.path())
        .args(["init", "--project", "storefront"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created cutover.yml"));

    assert!(config_path.exists(), "cutover.yml should be created");
    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("project: storefront"));
    assert!(content.contains("detection_fallback:"));
}

#[test]
fn init_refuses_to_overwrite_existing_config() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("cutover.yml");

    fs::write(&config_path, "existing: config").unwrap();

    cutover_cmd()
        .current_dir(temp_dir.path())
        .arg("init")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("already exists"));

    assert_eq!(fs::read_to_string(&config_path).unwrap(), "existing: config");
}

#[test]
fn init_force_overwrites() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("cutover.yml");
    fs::write(&config_path, "existing: config").unwrap();

    cutover_cmd()
        .current_dir(temp_dir.path())
        .args(["init", "--force"])
        .assert()
        .success();

    assert!(fs::read_to_string(&config_path).unwrap().contains("project: my-app"));
}

#[test]
fn deploy_without_config_exits_with_config_error() {
    let temp_dir = tempfile::tempdir().unwrap();

    cutover_cmd()
        .current_dir(temp_dir.path())
        .args(["deploy", "production", "v2"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("configuration file not found"));
}

#[test]
fn deploy_to_unknown_destination_exits_with_config_error() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(
        temp_dir.path().join("cutover.yml"),
        r#"
project: shop
proxy:
  config: /etc/nginx/conf.d/upstream.conf
services:
  - name: web
    ports: { blue: 8001, green: 8002 }
steps:
  deploy: "true"
destinations:
  production: {}
"#,
    )
    .unwrap();

    cutover_cmd()
        .current_dir(temp_dir.path())
        .args(["deploy", "qa", "v2"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown destination: qa"));
}

#[test]
fn invalid_version_exits_with_config_error() {
    let temp_dir = tempfile::tempdir().unwrap();
    cutover_cmd()
        .current_dir(temp_dir.path())
        .args(["init"])
        .assert()
        .success();

    cutover_cmd()
        .current_dir(temp_dir.path())
        .args(["deploy", "production", "v2 with spaces"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid version"));
}

#[test]
fn quiet_and_json_conflict() {
    cutover_cmd()
        .args(["--quiet", "--json", "status", "production"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}
