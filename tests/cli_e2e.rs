//! End-to-end tests for the casefetch binary surface.
//!
//! These stay offline: they exercise argument validation and the
//! configuration check that must fail before any network activity.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn missing_token_fails_before_any_request() {
    let mut cmd = Command::cargo_bin("casefetch").unwrap();
    cmd.env_remove("COURTLISTENER_TOKEN")
        .arg("civil rights")
        .assert()
        .failure()
        .stderr(predicate::str::contains("COURTLISTENER_TOKEN"));
}

#[test]
fn blank_token_fails_before_any_request() {
    let mut cmd = Command::cargo_bin("casefetch").unwrap();
    cmd.env("COURTLISTENER_TOKEN", "   ")
        .arg("civil rights")
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing API token"));
}

#[test]
fn no_arguments_shows_usage_error() {
    let mut cmd = Command::cargo_bin("casefetch").unwrap();
    cmd.env_remove("COURTLISTENER_TOKEN")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn help_lists_the_filters() {
    let mut cmd = Command::cargo_bin("casefetch").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--jurisdiction"))
        .stdout(predicate::str::contains("--filed-after"))
        .stdout(predicate::str::contains("--recap"));
}
