//! CLI tests for the commands that need no credential

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn cb(data_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("cb").expect("binary built");
    cmd.env("XDG_DATA_HOME", data_dir.path())
        .env("XDG_CONFIG_HOME", data_dir.path())
        .current_dir(data_dir.path());
    cmd
}

#[test]
fn test_tasks_text() {
    let dir = TempDir::new().unwrap();
    cb(&dir)
        .arg("tasks")
        .assert()
        .success()
        .stdout(predicate::str::contains("Build New Connector"))
        .stdout(predicate::str::contains("0/5 Completed"))
        .stdout(predicate::str::contains("Collect information from user"));
}

#[test]
fn test_tasks_json() {
    let dir = TempDir::new().unwrap();
    let output = cb(&dir).args(["tasks", "--format", "json"]).output().unwrap();
    assert!(output.status.success());

    let view: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(view["header"]["name"], "Build New Connector");
    assert_eq!(view["connector"].as_array().unwrap().len(), 3);
    assert_eq!(view["finalization"].as_array().unwrap().len(), 2);
}

#[test]
fn test_tools_lists_builtins() {
    let dir = TempDir::new().unwrap();
    cb(&dir)
        .arg("tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("replace_manifest_lines"))
        .stdout(predicate::str::contains("update_task_status"))
        .stdout(predicate::str::contains("update_form_field"));
}

#[test]
fn test_chat_without_key_fails_fast() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join(".connector-builder.yml"),
        "llm:\n  api-key-env: CB_CLI_TEST_UNSET_KEY\n",
    )
    .unwrap();

    cb(&dir)
        .arg("chat")
        .assert()
        .failure()
        .stderr(predicate::str::contains("CB_CLI_TEST_UNSET_KEY"));
}

#[test]
fn test_unknown_format_rejected() {
    let dir = TempDir::new().unwrap();
    cb(&dir).args(["tasks", "--format", "xml"]).assert().failure();
}
