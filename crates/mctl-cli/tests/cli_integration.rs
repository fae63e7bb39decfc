//! CLI integration tests
//!
//! Tests the menuctl CLI using assert_cmd. Nothing here needs a remote host.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn menuctl() -> Command {
    let mut cmd = Command::cargo_bin("menuctl")
        .expect("Failed to locate menuctl binary - ensure it's built before running tests");
    cmd.env_remove("MENUCTL_USER").env_remove("MENUCTL_PASSWORD");
    cmd
}

#[test]
fn test_cli_help() {
    menuctl()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("menuctl"))
        .stdout(predicate::str::contains("Remote process console"));
}

#[test]
fn test_cli_version() {
    menuctl()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("menuctl"));
}

#[test]
fn test_cli_ps_help() {
    menuctl()
        .args(["ps", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--filter-user"))
        .stdout(predicate::str::contains("--filter-cmd"));
}

#[test]
fn test_cli_kill_requires_pids() {
    menuctl().arg("kill").assert().failure();
}

#[test]
fn test_cli_lookup_help() {
    menuctl()
        .args(["lookup-id", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("work directory"));
    menuctl()
        .args(["lookup-screen", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("data directory"));
}

#[test]
fn test_cli_unknown_command() {
    menuctl()
        .arg("nonexistent-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_cli_config_init_show_get_set() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");
    let admin = dir.path().join("admin.toml");
    let config_arg = config.to_str().unwrap();
    let admin_arg = admin.to_str().unwrap();

    menuctl()
        .args(["config", "init", "--config", config_arg, "--admin-config", admin_arg])
        .assert()
        .success();
    assert!(config.exists());
    assert!(admin.exists());

    menuctl()
        .args(["config", "get", "menu.work_path", "--config", config_arg])
        .assert()
        .success()
        .stdout(predicate::str::contains("/d/work"));

    menuctl()
        .args([
            "config",
            "set",
            "menu.timings.lookup_settle",
            "3000",
            "--config",
            config_arg,
        ])
        .assert()
        .success();

    menuctl()
        .args(["config", "get", "menu.timings.lookup_settle", "--config", config_arg])
        .assert()
        .success()
        .stdout(predicate::str::contains("3000"));

    menuctl()
        .args(["config", "show", "--config", config_arg, "--admin-config", admin_arg])
        .assert()
        .success()
        .stdout(predicate::str::contains("ps aux"));
}

#[test]
fn test_cli_config_set_rejects_bad_value() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");

    menuctl()
        .args([
            "config",
            "set",
            "default_port",
            "not-a-port",
            "--config",
            config.to_str().unwrap(),
        ])
        .assert()
        .failure();
    assert!(!config.exists());
}

#[test]
fn test_cli_ps_without_password_fails() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");

    menuctl()
        .args([
            "ps",
            "--host",
            "127.0.0.1",
            "--user",
            "operator",
            "--config",
            config.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("password"));
}
