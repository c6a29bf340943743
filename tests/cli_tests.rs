//! Integration tests for the analytics-result inspector binary

use analytics_result::testing::ResponseDocument;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use assert_cmd::Command;
use tempfile::TempDir;

fn write_document(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn success_document() -> String {
    ResponseDocument::new()
        .request_id("cli-req")
        .signature(json!({"*": "*"}))
        .results(vec![json!({"id": 1}), json!({"id": 2}), json!({"id": 3})])
        .warnings(vec![json!({"code": 5, "msg": "slow plan"})])
        .status("success")
        .metrics(json!({"resultCount": 3}))
        .build()
}

#[test]
fn test_rows_go_to_stdout_and_sections_to_stderr() {
    let dir = TempDir::new().unwrap();
    let path = write_document(&dir, "response.json", &success_document());

    Command::cargo_bin("analytics-result")
        .unwrap()
        .arg(&path)
        .args(["--chunk-size", "7"])
        .assert()
        .success()
        .stdout("{\"id\":1}\n{\"id\":2}\n{\"id\":3}\n")
        .stderr(predicate::str::contains("requestID: cli-req"))
        .stderr(predicate::str::contains("warning: 5: slow plan"))
        .stderr(predicate::str::contains(r#"metrics: {"resultCount":3}"#))
        .stderr(predicate::str::contains("status: success"));
}

#[test]
fn test_reads_from_stdin() {
    Command::cargo_bin("analytics-result")
        .unwrap()
        .write_stdin(success_document())
        .assert()
        .success()
        .stdout(predicate::str::contains("{\"id\":2}"));
}

#[test]
fn test_max_rows_cancels_the_query() {
    let dir = TempDir::new().unwrap();
    let path = write_document(&dir, "response.json", &success_document());

    Command::cargo_bin("analytics-result")
        .unwrap()
        .arg(&path)
        .args(["--max-rows", "1"])
        .assert()
        .code(1)
        .stdout("{\"id\":1}\n")
        .stderr(predicate::str::contains("status: stopped"));
}

#[test]
fn test_failed_query_exits_non_zero() {
    let dir = TempDir::new().unwrap();
    let doc = ResponseDocument::new()
        .errors(vec![json!({"code": 24045, "msg": "Cannot find dataset"})])
        .status("fatal")
        .build();
    let path = write_document(&dir, "response.json", &doc);

    Command::cargo_bin("analytics-result")
        .unwrap()
        .arg(&path)
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("error: 24045: Cannot find dataset"))
        .stderr(predicate::str::contains("status: fatal"));
}

#[test]
fn test_invalid_config_is_reported() {
    let dir = TempDir::new().unwrap();
    let config = write_document(&dir, "stream.toml", "row_buffer = 0\n");
    let path = write_document(&dir, "response.json", &success_document());

    Command::cargo_bin("analytics-result")
        .unwrap()
        .arg(&path)
        .arg("--config")
        .arg(&config)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("E5003"));
}

#[test]
fn test_missing_input_file_is_reported() {
    Command::cargo_bin("analytics-result")
        .unwrap()
        .arg("/nonexistent/response.json")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("failed to open"));
}
