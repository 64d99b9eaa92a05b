//! Integration test: the `vega session` and `vega config` subcommands
//!
//! Seeds a data directory with a saved session, then drives the binary.

use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use tempfile::tempdir;
use vega::internal::session::{Content, Session};

const SECRET: &str = "sk-abcdefghijklmnopqrstuvwxyz0123456789";

fn seed_session(data_dir: &Path) -> String {
    let session = Session::new("/repo");
    session.add_user_message("setup");
    session.add_model_message("ready");
    session.add_content_with_tokens(Content::user(format!("deploy with {SECRET}")), 9);

    let sessions = data_dir.join("sessions");
    std::fs::create_dir_all(&sessions).unwrap();
    let state = session.snapshot();
    std::fs::write(
        sessions.join(format!("{}.json", state.id)),
        serde_json::to_string_pretty(&state).unwrap(),
    )
    .unwrap();
    state.id
}

fn vega(data_dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("vega"));
    cmd.arg("--data-dir")
        .arg(data_dir)
        .env("NO_COLOR", "1")
        .env_remove("VEGA_AUTOSAVE")
        .env_remove("VEGA_SAVE_INTERVAL_SECS");
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(output).unwrap()
}

/// Test: list shows the saved session with its summary
#[test]
fn test_session_list() {
    let dir = tempdir().unwrap();
    let empty = stdout_of(vega(dir.path()).args(["session", "list"]));
    assert!(empty.contains("No saved sessions."));

    let id = seed_session(dir.path());
    let listed = stdout_of(vega(dir.path()).args(["session", "list"]));
    assert!(listed.contains(&id));
    assert!(listed.contains("3 msgs"));
}

/// Test: show and export never print the secret
#[test]
fn test_session_show_and_export_redact() {
    let dir = tempdir().unwrap();
    let id = seed_session(dir.path());

    let shown = stdout_of(vega(dir.path()).args(["session", "show", &id]));
    assert!(shown.contains("## User"));
    assert!(shown.contains("deploy with [REDACTED]"));
    assert!(!shown.contains(SECRET));

    let out = dir.path().join("export.json");
    vega(dir.path())
        .args(["session", "export", &id, "--format", "json", "--output"])
        .arg(&out)
        .assert()
        .success();
    let exported = std::fs::read_to_string(&out).unwrap();
    assert!(!exported.contains(SECRET));
    let value: serde_json::Value = serde_json::from_str(&exported).unwrap();
    assert_eq!(value["id"], serde_json::json!(id));
}

/// Test: delete removes the record and a second delete fails
#[test]
fn test_session_delete() {
    let dir = tempdir().unwrap();
    let id = seed_session(dir.path());

    vega(dir.path())
        .args(["session", "delete", &id])
        .assert()
        .success();
    assert!(!dir.path().join("sessions").join(format!("{id}.json")).exists());

    vega(dir.path())
        .args(["session", "delete", &id])
        .assert()
        .failure();
}

/// Test: show on an unknown id fails cleanly
#[test]
fn test_session_show_missing() {
    let dir = tempdir().unwrap();
    vega(dir.path())
        .args(["session", "show", "does-not-exist"])
        .assert()
        .failure();
}

/// Test: config prints the project tier's values as TOML
#[test]
fn test_config_reads_project_tier() {
    let work = tempdir().unwrap();
    let data = tempdir().unwrap();
    std::fs::create_dir_all(work.path().join(".vega")).unwrap();
    std::fs::write(
        work.path().join(".vega").join("config.toml"),
        "max_sessions = 3\nsave_interval_secs = 45\n",
    )
    .unwrap();

    let printed = stdout_of(vega(data.path()).current_dir(work.path()).arg("config"));
    assert!(printed.contains("max_sessions = 3"));
    assert!(printed.contains("save_interval_secs = 45"));
}
