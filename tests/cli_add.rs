//! Integration tests for the `ytpl add` and `ytpl auth` commands.
//!
//! These commands need OAuth credentials and the YouTube API, so we test
//! argument validation and the fatal pre-condition paths that fail before
//! any network access.

#![allow(deprecated)] // cargo_bin deprecation; replacement not yet stable

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::{tempdir, NamedTempFile};

/// Helper: get a Command for the `ytpl` binary.
fn ytpl() -> Command {
    Command::cargo_bin("ytpl").expect("binary 'ytpl' should be built")
}

fn url_list() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "https://youtu.be/dQw4w9WgXcQ").unwrap();
    file
}

// ─── Argument validation (exit 2) ────────────────────────────────────────────

#[test]
fn add_missing_file_flag_fails() {
    ytpl()
        .args(["add", "--playlist-id", "PL123"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--file <FILE>"));
}

#[test]
fn add_missing_playlist_flag_fails() {
    let list = url_list();
    ytpl()
        .args(["add", "--file"])
        .arg(list.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--playlist-id <PLAYLIST_ID>"));
}

#[test]
fn add_nonexistent_file_fails() {
    ytpl()
        .args(["add", "-f", "/no/such/urls.txt", "-p", "PL123"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn add_directory_instead_of_file_fails() {
    let dir = tempdir().unwrap();
    ytpl()
        .args(["add", "-p", "PL123", "-f"])
        .arg(dir.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("not a regular file"));
}

// ─── Fatal pre-conditions (exit 1) ───────────────────────────────────────────

#[test]
fn add_without_client_secrets_exits_with_error() {
    let dir = tempdir().unwrap();
    let list = url_list();
    ytpl()
        .arg("--client-secrets")
        .arg(dir.path().join("client_secrets.json"))
        .arg("--token-cache")
        .arg(dir.path().join("token.json"))
        .args(["add", "-p", "PL123", "-f"])
        .arg(list.path())
        .timeout(std::time::Duration::from_secs(10))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("client_secrets.json not found"))
        .stdout(predicate::str::contains("Summary").not());
}

#[test]
fn auth_without_client_secrets_exits_with_error() {
    let dir = tempdir().unwrap();
    ytpl()
        .arg("--client-secrets")
        .arg(dir.path().join("missing.json"))
        .arg("auth")
        .timeout(std::time::Duration::from_secs(10))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to authenticate"));
}

#[test]
fn missing_explicit_config_exits_with_error() {
    ytpl()
        .args(["--config", "/no/such/config.toml", "auth"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn malformed_config_exits_with_error() {
    let mut config = NamedTempFile::new().unwrap();
    writeln!(config, "[retry]\nmax_attempts = \"three\"").unwrap();
    ytpl()
        .arg("--config")
        .arg(config.path())
        .arg("auth")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid TOML"));
}
