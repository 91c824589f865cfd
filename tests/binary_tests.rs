//! Integration tests for the query-pattern-analyzer binary.

use std::io::Write;

use assert_cmd::{Command, cargo::cargo_bin_cmd};
use predicates::prelude::*;
use tempfile::{Builder, NamedTempFile};

fn cmd() -> Command {
    cargo_bin_cmd!("query-pattern-analyzer")
}

fn sql_file(sql: &str) -> NamedTempFile {
    let mut file = Builder::new().suffix(".sql").tempfile().unwrap();
    writeln!(file, "{}", sql).unwrap();
    file
}

#[test]
fn test_analyze_clean_query() {
    let file = sql_file("SELECT id FROM users WHERE id = 1;");

    cmd()
        .args(["analyze", file.path().to_str().unwrap(), "--no-color"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No anti-patterns found."));
}

#[test]
fn test_analyze_cross_join_exits_one() {
    let file = sql_file("SELECT a.id FROM users a CROSS JOIN accounts b");

    cmd()
        .args(["analyze", file.path().to_str().unwrap(), "--no-color"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("cross-join-without-filter"));
}

#[test]
fn test_analyze_missing_file() {
    cmd()
        .args(["analyze", "/nonexistent/model.sql"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_analyze_syntax_error() {
    let file = sql_file("SELECT id FROM");

    cmd()
        .args(["analyze", file.path().to_str().unwrap()])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_analyze_malformed_tree() {
    let mut file = Builder::new().suffix(".json").tempfile().unwrap();
    write!(
        file,
        r#"{{"version": 1,
            "ctes": [{{"name": "a", "body": {{"branches": [{{"from": {{"name": "b", "kind": "cte"}}}}]}}}},
                     {{"name": "b", "body": {{"branches": [{{"from": {{"name": "raw.b"}}}}]}}}}],
            "body": {{"branches": [{{"from": {{"name": "a"}}}}]}}}}"#
    )
    .unwrap();

    cmd()
        .args(["analyze", file.path().to_str().unwrap()])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_analyze_json_tree_fixture() {
    cmd()
        .args(["analyze", "tests/fixtures/regional_products.json", "--no-color"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("unused-cte"));
}

#[test]
fn test_analyze_min_severity_critical() {
    let file = sql_file("WITH unused AS (SELECT id FROM raw.t WHERE id > 0) SELECT id FROM users WHERE id = 1");

    cmd()
        .args([
            "analyze",
            file.path().to_str().unwrap(),
            "--min-severity",
            "critical",
            "--no-color"
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("unused-cte").not());
}

#[test]
fn test_analyze_json_output() {
    let file = sql_file("SELECT a.id FROM users a CROSS JOIN accounts b");

    cmd()
        .args(["analyze", file.path().to_str().unwrap(), "-f", "json"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"critical\": 1"));
}

#[test]
fn test_analyze_stdin() {
    cmd()
        .args(["analyze", "-", "--no-color"])
        .write_stdin("SELECT id FROM users WHERE id = 1")
        .assert()
        .success();
}

#[test]
fn test_parse_command() {
    let file = sql_file("WITH a AS (SELECT id FROM raw.t) SELECT id FROM a");

    cmd()
        .args(["parse", file.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"version\": 1"))
        .stdout(predicate::str::contains("raw.t"));
}

#[test]
fn test_rules_command() {
    cmd()
        .args(["rules"])
        .assert()
        .success()
        .stdout(predicate::str::contains("unused-cte"))
        .stdout(predicate::str::contains("excessive-window-functions"));
}

#[test]
fn test_help() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("analyze"));
}
