//! CLI integration tests for the kvsession command-line interface.
//!
//! Every test runs with an empty config directory and working directory so
//! the user's own config files never leak in.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a command for the kvsession binary, isolated from local config.
fn kvsession(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("kvsession").unwrap();
    cmd.current_dir(dir.path())
        .env("KVSESSION_CONFIG_DIR", dir.path().join("user"))
        .env_remove("KVSESSION_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    kvsession(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("smoke"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_displays() {
    let dir = TempDir::new().unwrap();
    kvsession(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("kvsession"));
}

#[test]
fn test_unknown_backend_rejected() {
    let dir = TempDir::new().unwrap();
    kvsession(&dir)
        .args(["smoke", "--backend", "redis"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown backend"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Smoke
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_smoke_memory_backend_passes() {
    let dir = TempDir::new().unwrap();
    kvsession(&dir)
        .args(["smoke", "--backend", "memory"])
        .assert()
        .success()
        .stdout(predicate::str::contains("identical save is metadata only"))
        .stdout(predicate::str::contains("✗").not());
}

#[test]
fn test_smoke_document_backend_json() {
    let dir = TempDir::new().unwrap();
    let output = kvsession(&dir)
        .args(["smoke", "--backend", "document", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["backend"], "document");
    assert_eq!(report["published"], true);
    assert_eq!(
        report["metrics_name"],
        "SessionClustering:document:127.0.0.1:11211"
    );
    let steps = report["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 6);
    assert!(steps.iter().all(|s| s["passed"] == true));
}

#[test]
fn test_smoke_respects_config_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("kvsession.toml"),
        "[metrics]\nenabled = false\ncategory = \"Sessions\"\n",
    )
    .unwrap();

    let output = kvsession(&dir).args(["smoke", "--json"]).output().unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["backend"], "memory");
    assert_eq!(report["published"], false);
    assert_eq!(report["metrics_name"], "Sessions:memory:127.0.0.1:11211");
}

// ─────────────────────────────────────────────────────────────────────────────
// Config
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_config_show_defaults() {
    let dir = TempDir::new().unwrap();
    kvsession(&dir)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("No config files loaded"))
        .stdout(predicate::str::contains("SessionClustering"));
}

#[test]
fn test_config_init_then_which() {
    let dir = TempDir::new().unwrap();
    kvsession(&dir)
        .args(["config", "init", "--local"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config file"));
    assert!(dir.path().join("kvsession.toml").is_file());

    kvsession(&dir)
        .args(["config", "which"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 config file(s) loaded."));
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "[cache]\nreconcile_workers = 0\n").unwrap();

    kvsession(&dir)
        .arg("--config")
        .arg(&path)
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("reconcile_workers"));
}

#[test]
fn test_oversized_session_ttl_is_rejected() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("kvsession.toml"),
        "[cache]\nsession_ttl_secs = 9223372036854775807\n",
    )
    .unwrap();

    kvsession(&dir)
        .arg("smoke")
        .assert()
        .failure()
        .stderr(predicate::str::contains("session_ttl_secs"))
        .stderr(predicate::str::contains("panicked").not());
}
