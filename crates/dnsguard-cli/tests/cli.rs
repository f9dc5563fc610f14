//! End-to-end tests of the `dnsguard` binary.
//!
//! None of these reach the network: each one either only touches the config
//! file or fails validation before the first query.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// The binary with its config pointed into a scratch directory.
fn dnsguard(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("dnsguard").unwrap();
    cmd.env("DNSGUARD_CONFIG", dir.path().join("config.toml"))
        .env_remove("RUST_LOG")
        .arg("--no-color");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    dnsguard(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("lookup"))
        .stdout(predicate::str::contains("trace"))
        .stdout(predicate::str::contains("email"))
        .stdout(predicate::str::contains("scan"));
}

#[test]
fn test_scan_help_lists_report_flags() {
    let dir = TempDir::new().unwrap();
    dnsguard(&dir)
        .args(["scan", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--html"))
        .stdout(predicate::str::contains("--dkim-selectors"));
}

#[test]
fn test_email_server_must_be_an_address() {
    let dir = TempDir::new().unwrap();
    dnsguard(&dir)
        .args(["email", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--server"));
    dnsguard(&dir)
        .args(["email", "example.com", "--server", "resolver.example"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_invalid_domain_fails() {
    let dir = TempDir::new().unwrap();
    dnsguard(&dir)
        .args(["lookup", "bad_domain..com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid domain name"));
}

#[test]
fn test_scan_invalid_domain_fails() {
    let dir = TempDir::new().unwrap();
    dnsguard(&dir)
        .args(["scan", "-o", "json", "exa mple.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid domain name"));
}

#[test]
fn test_invalid_selector_fails() {
    let dir = TempDir::new().unwrap();
    dnsguard(&dir)
        .args(["email", "example.com", "--dkim-selectors", "bad selector"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid DKIM selector"));
}

#[test]
fn test_zero_timeout_rejected() {
    let dir = TempDir::new().unwrap();
    dnsguard(&dir)
        .args(["--timeout", "0", "trace", "example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("timeout must be > 0"));
}

#[test]
fn test_unknown_record_type_rejected() {
    let dir = TempDir::new().unwrap();
    dnsguard(&dir)
        .args(["lookup", "example.com", "-t", "NOPE"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown record type"));
}

#[test]
fn test_config_path_follows_env() {
    let dir = TempDir::new().unwrap();
    dnsguard(&dir)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_init_then_refuse_overwrite() {
    let dir = TempDir::new().unwrap();
    dnsguard(&dir).args(["config", "init"]).assert().success();

    let written = std::fs::read_to_string(dir.path().join("config.toml")).unwrap();
    assert!(written.contains("timeout_ms = 2000"));

    dnsguard(&dir)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
    dnsguard(&dir)
        .args(["config", "init", "--force"])
        .assert()
        .success();
}

#[test]
fn test_config_show_merges_flags_over_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        "[probe]\ntimeout_ms = 900\ndeadline_secs = 45\n",
    )
    .unwrap();

    dnsguard(&dir)
        .args(["config", "show", "-o", "json", "--timeout", "300"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"timeout_ms\": 300"))
        .stdout(predicate::str::contains("\"deadline_secs\": 45"));
}

#[test]
fn test_broken_config_file_fails() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("config.toml"), "[probe\n").unwrap();

    dnsguard(&dir)
        .args(["config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("parsing"));
}
