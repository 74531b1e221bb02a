//! CLI integration tests
//!
//! Tests the panelforge CLI using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;

const JOB: &str = r#"
[target]
address = "203.0.113.10"
username = "root"

[panel]
admin_username = "admin"
admin_password = "s3cret-Admin!"
"#;

fn panelforge() -> Command {
    let mut cmd = Command::cargo_bin("panelforge")
        .expect("Failed to locate panelforge binary - ensure it's built before running tests");
    cmd.env_remove("PANELFORGE_SSH_PASSWORD")
        .env_remove("PANELFORGE_SERVER");
    cmd
}

#[test]
fn test_cli_help() {
    panelforge()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("panelforge"))
        .stdout(predicate::str::contains(
            "Provision web administration panels",
        ));
}

#[test]
fn test_cli_version() {
    panelforge()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("panelforge"));
}

#[test]
fn test_cli_install_help() {
    panelforge()
        .args(["install", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PANELFORGE_SSH_PASSWORD"));
}

#[test]
fn test_cli_requires_subcommand() {
    panelforge().assert().failure();
}

#[test]
fn test_artifacts_free_tier() {
    panelforge()
        .args(["artifacts"])
        .assert()
        .success()
        .stdout(predicate::str::contains("index.php"))
        .stdout(predicate::str::contains("config.php"))
        .stdout(predicate::str::contains("reports.php").not());
}

#[test]
fn test_artifacts_enterprise_tier() {
    panelforge()
        .args(["artifacts", "--tier", "enterprise"])
        .assert()
        .success()
        .stdout(predicate::str::contains("api_keys.php"))
        .stdout(predicate::str::contains("multi_server.php"));
}

#[test]
fn test_artifacts_unknown_tier() {
    panelforge()
        .args(["artifacts", "--tier", "platinum"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown tier"));
}

#[test]
fn test_install_missing_job_file() {
    let dir = tempfile::tempdir().unwrap();
    panelforge()
        .arg("install")
        .arg(dir.path().join("absent.toml"))
        .args(["--password", "hunter2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load job file"));
}

#[test]
fn test_install_requires_password() {
    let dir = tempfile::tempdir().unwrap();
    let job = dir.path().join("job.toml");
    std::fs::write(&job, JOB).unwrap();

    panelforge()
        .arg("install")
        .arg(&job)
        .assert()
        .failure()
        .stderr(predicate::str::contains("SSH password required"));
}

#[test]
fn test_status_malformed_id() {
    panelforge()
        .args(["status", "not-a-uuid", "--server", "127.0.0.1:1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid installation id"));
}

#[test]
fn test_config_path_honours_flag() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.toml");

    panelforge()
        .arg("--config")
        .arg(&path)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("custom.toml"));
}

#[test]
fn test_config_init_then_show() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");

    panelforge()
        .arg("--config")
        .arg(&path)
        .args(["config", "init"])
        .assert()
        .success();
    assert!(path.exists());

    panelforge()
        .arg("--config")
        .arg(&path)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bind_address"))
        .stdout(predicate::str::contains("ssh_panel"));
}
