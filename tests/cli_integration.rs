//! CLI integration tests
//!
//! Only exercises paths that never reach the network.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn test_version_flag() {
    let mut cmd = cargo_bin_cmd!("suno");
    cmd.arg("--version");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_lists_subcommands() {
    let mut cmd = cargo_bin_cmd!("suno");
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("generate"))
        .stdout(predicate::str::contains("download"))
        .stdout(predicate::str::contains("fetch"))
        .stdout(predicate::str::contains("--cookie"));
}

#[test]
fn test_download_help_shows_type() {
    let mut cmd = cargo_bin_cmd!("suno");
    cmd.args(["download", "--help"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--type"))
        .stdout(predicate::str::contains("--no-wait"));
}

#[test]
fn test_missing_cookie_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("missing.toml");

    let mut cmd = cargo_bin_cmd!("suno");
    cmd.env_remove("SUNO_COOKIE")
        .args(["--config", config.to_str().unwrap(), "credits"]);

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("cookie"));
}

#[test]
fn test_invalid_config_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("config.toml");
    std::fs::write(&config, "this is = = not toml").unwrap();

    let mut cmd = cargo_bin_cmd!("suno");
    cmd.env_remove("SUNO_COOKIE")
        .args(["--config", config.to_str().unwrap(), "songs"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("configuration"));
}

#[test]
fn test_unknown_subcommand_rejected() {
    let mut cmd = cargo_bin_cmd!("suno");
    cmd.arg("remix");

    cmd.assert().failure().code(2);
}

#[test]
fn test_invalid_file_type_rejected() {
    let mut cmd = cargo_bin_cmd!("suno");
    cmd.args([
        "--cookie",
        "__client=abc",
        "wait",
        "0f6c3a9e-3c43-4c1b-9a1e-1d2f3a4b5c6d",
        "--type",
        "lyrics",
    ]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("lyrics"));
}
