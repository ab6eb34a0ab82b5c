//! CLI surface tests that do not require providers or endpoints.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_help_lists_all_operations() {
    let mut cmd = Command::cargo_bin("semem").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("tell"))
        .stdout(predicate::str::contains("ask"))
        .stdout(predicate::str::contains("navigate"))
        .stdout(predicate::str::contains("augment"))
        .stdout(predicate::str::contains("iterate"));
}

#[test]
fn test_unknown_zoom_is_rejected() {
    let mut cmd = Command::cargo_bin("semem").unwrap();
    cmd.args(["navigate", "--zoom", "galaxy"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported zoom level"));
}

#[test]
fn test_missing_config_file_is_reported() {
    let mut cmd = Command::cargo_bin("semem").unwrap();
    cmd.args(["--config", "/nonexistent/semem.toml", "ask", "q"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot load config"));
}
