//! Line-delimited JSON scripting mode: request/response contract and
//! per-request identity override.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::tempdir;

fn io_session(home: &Path, root: &Path, input: &str) -> Vec<Value> {
    let mut cmd = Command::cargo_bin("casefile").unwrap();
    let out = cmd
        .env("XDG_CONFIG_HOME", home)
        .args(["--root", root.to_str().unwrap(), "io"])
        .write_stdin(input.to_string())
        .output()
        .unwrap();
    assert!(out.status.success());
    String::from_utf8(out.stdout)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn setup() -> (tempfile::TempDir, PathBuf, PathBuf) {
    let tmp = tempdir().unwrap();
    let home = tmp.path().join("xdg");
    let root = tmp.path().join("store");
    std::fs::create_dir_all(&home).unwrap();

    Command::cargo_bin("casefile")
        .unwrap()
        .env("XDG_CONFIG_HOME", &home)
        .args(["--root", root.to_str().unwrap(), "init", "--id-scheme", "sequential"])
        .assert()
        .success();
    Command::cargo_bin("casefile")
        .unwrap()
        .env("XDG_CONFIG_HOME", &home)
        .args([
            "--root",
            root.to_str().unwrap(),
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
fn requests_answered_in_order_with_typed_results() {
    let (_tmp, home, root) = setup();

    let input = concat!(
        r#"{"command": "create", "params": {"title": "Fix login bug", "kv": ["component$auth"]}}"#,
        "\n",
        r#"{"command": "add-note", "params": {"record_id": "REC-00001", "message": "triaged"}}"#,
        "\n",
        r#"{"command": "list", "params": {"search": "login"}}"#,
        "\n",
        r#"{"command": "diagnose", "params": {}}"#,
        "\n",
    );
    let responses = io_session(&home, &root, input);
    assert_eq!(responses.len(), 4);

    assert_eq!(responses[0]["success"], true);
    assert_eq!(responses[0]["result"]["id"], "REC-00001");
    assert_eq!(responses[0]["result"]["indexed"], true);

    assert_eq!(responses[1]["success"], true);
    assert!(responses[1]["result"]["id"].as_str().unwrap().starts_with("NT-"));

    assert_eq!(responses[2]["success"], true);
    let rows = responses[2]["result"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], "REC-00001");

    assert_eq!(responses[3]["success"], true);
    assert_eq!(responses[3]["result"]["clean"], true);
}

#[test]
fn identity_override_applies_to_that_request_only() {
    let (_tmp, home, root) = setup();

    let input = concat!(
        r#"{"command": "create", "params": {"title": "From bob"}, "id": {"handle": "bob", "email": "bob@example.com"}}"#,
        "\n",
        r#"{"command": "create", "params": {"title": "From default"}}"#,
        "\n",
        r#"{"command": "view", "params": {"id": "REC-00001"}}"#,
        "\n",
        r#"{"command": "view", "params": {"id": "REC-00002"}}"#,
        "\n",
    );
    let responses = io_session(&home, &root, input);

    assert_eq!(responses[2]["result"]["author"]["handle"], "bob");
    assert_eq!(responses[3]["result"]["author"]["handle"], "alice");
}

#[test]
fn errors_carry_a_typed_kind() {
    let (_tmp, home, root) = setup();

    let input = concat!(
        r#"{"command": "view", "params": {"id": "REC-09999"}}"#,
        "\n",
        r#"{"command": "create", "params": {"title": "Bad kv", "kv": ["count#twelve"]}}"#,
        "\n",
        r#"{"command": "bogus", "params": {}}"#,
        "\n",
        "this is not json\n",
    );
    let responses = io_session(&home, &root, input);
    assert_eq!(responses.len(), 4);

    assert_eq!(responses[0]["success"], false);
    assert_eq!(responses[0]["error"]["kind"], "not_found");

    assert_eq!(responses[1]["success"], false);
    assert_eq!(responses[1]["error"]["kind"], "type");

    assert_eq!(responses[2]["success"], false);
    assert_eq!(responses[2]["error"]["kind"], "invalid_request");

    assert_eq!(responses[3]["success"], false);
    assert_eq!(responses[3]["error"]["kind"], "invalid_request");
}

#[test]
fn init_via_protocol() {
    let tmp = tempdir().unwrap();
    let home = tmp.path().join("xdg");
    let root = tmp.path().join("fresh");
    std::fs::create_dir_all(&home).unwrap();

    let input = concat!(
        r#"{"command": "init", "params": {"format": "toml", "id_scheme": "sequential"}}"#,
        "\n",
    );
    let responses = io_session(&home, &root, input);
    assert_eq!(responses[0]["success"], true);
    assert!(root.join("records").is_dir());
    assert!(root.join("config.toml").is_file());
}
