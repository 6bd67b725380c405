//! End-to-end CLI tests against a real store in a temp directory.

use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::tempdir;

fn casefile(home: &Path, root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("casefile").unwrap();
    cmd.env("XDG_CONFIG_HOME", home);
    cmd.env("NO_COLOR", "1");
    cmd.args(["--root", root.to_str().unwrap()]);
    cmd
}

/// Fresh (config home, store root) pair with an initialized sequential store
/// and a configured default user.
fn setup() -> (tempfile::TempDir, PathBuf, PathBuf) {
    let tmp = tempdir().unwrap();
    let home = tmp.path().join("xdg");
    let root = tmp.path().join("store");
    std::fs::create_dir_all(&home).unwrap();

    casefile(&home, &root)
        .args(["init", "--id-scheme", "sequential"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized store"));

    casefile(&home, &root)
        .args([
            "config",
            "set-user",
            "--handle",
            "alice",
            "--email",
            "alice@example.com",
        ])
        .assert()
        .success();

    (tmp, home, root)
}

#[test]
fn create_view_list_note_roundtrip() {
    let (_tmp, home, root) = setup();

    casefile(&home, &root)
        .args([
            "create",
            "--title",
            "Fix login bug",
            "--body",
            "SSO users cannot log in.",
            "--kv",
            "component$auth",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created REC-00001"));

    casefile(&home, &root)
        .args(["note", "add", "REC-00001", "--message", "Reproduced on staging."])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added NT-"));

    casefile(&home, &root)
        .args(["view", "REC-00001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Fix login bug"))
        .stdout(predicate::str::contains("alice <alice@example.com>"))
        .stdout(predicate::str::contains("Reproduced on staging."));

    casefile(&home, &root)
        .args(["list", "--search", "LOGIN"])
        .assert()
        .success()
        .stdout(predicate::str::contains("REC-00001"));

    // The record file exists under the documented layout.
    assert!(root.join("records/REC-00001.md").is_file());
}

#[test]
fn identity_flags_override_one_invocation_only() {
    let (_tmp, home, root) = setup();

    casefile(&home, &root)
        .args([
            "--handle",
            "robot",
            "--email",
            "robot@ci.example.com",
            "create",
            "--title",
            "Automated",
        ])
        .assert()
        .success();

    casefile(&home, &root)
        .args(["create", "--title", "Manual"])
        .assert()
        .success();

    casefile(&home, &root)
        .args(["view", "REC-00001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("robot <robot@ci.example.com>"));

    casefile(&home, &root)
        .args(["view", "REC-00002"])
        .assert()
        .success()
        .stdout(predicate::str::contains("alice <alice@example.com>"));
}

#[test]
fn kv_search_and_sort() {
    let (_tmp, home, root) = setup();

    casefile(&home, &root)
        .args(["create", "--title", "Cheap", "--kv", "cost#10"])
        .assert()
        .success();
    casefile(&home, &root)
        .args(["create", "--title", "Pricey", "--kv", "cost#900"])
        .assert()
        .success();

    let out = casefile(&home, &root)
        .args(["list", "--ksearch", "cost>100"])
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Pricey"));
    assert!(!stdout.contains("Cheap"));

    let out = casefile(&home, &root)
        .args(["list", "--ksort", "cost-"])
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&out.stdout);
    let pricey = stdout.find("Pricey").unwrap();
    let cheap = stdout.find("Cheap").unwrap();
    assert!(pricey < cheap, "descending cost puts Pricey first");
}

#[test]
fn reindex_heals_missing_index() {
    let (_tmp, home, root) = setup();

    casefile(&home, &root)
        .args(["create", "--title", "Survivor"])
        .assert()
        .success();

    std::fs::remove_file(root.join("index.db")).unwrap();

    casefile(&home, &root)
        .args(["diagnose"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Drift detected"))
        .stdout(predicate::str::contains("casefile reindex"));

    casefile(&home, &root)
        .args(["diagnose", "--strict"])
        .assert()
        .failure();

    casefile(&home, &root)
        .args(["reindex"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Reindexed 1 records"));

    casefile(&home, &root)
        .args(["diagnose"])
        .assert()
        .success()
        .stdout(predicate::str::contains("consistent"));
}

#[test]
fn missing_record_is_a_clean_error() {
    let (_tmp, home, root) = setup();
    casefile(&home, &root)
        .args(["view", "REC-09999"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn create_without_identity_fails_with_guidance() {
    let tmp = tempdir().unwrap();
    let home = tmp.path().join("xdg");
    let root = tmp.path().join("store");
    std::fs::create_dir_all(&home).unwrap();

    casefile(&home, &root).args(["init"]).assert().success();
    casefile(&home, &root)
        .args(["create", "--title", "Anonymous"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("set-user"));
}
