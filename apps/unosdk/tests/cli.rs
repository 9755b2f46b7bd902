#![warn(clippy::pedantic)]

//! Integration tests for the unosdk CLI.
//!
//! These tests spawn the compiled `unosdk` binary and check stdout, stderr
//! and exit codes.
//!
//! ## Test Infrastructure
//!
//! - Uses `assert_cmd` for spawning and asserting on command execution
//! - Uses `assert_fs` for temporary filesystem operations
//! - Uses `predicates` for flexible output matching
//!
//! Every command runs with `UNOSDK_HOME`, `HOME` and `UNOSDK_MACHINE_DIR`
//! pointing into a fresh temporary directory, so no test touches the real
//! environment. Nothing here needs network access.

use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;
use std::process::Command;

/// Builds a `unosdk` command isolated inside `temp`.
fn unosdk(temp: &assert_fs::TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("unosdk"));
    cmd.env("UNOSDK_HOME", temp.path().join("root"))
        .env("HOME", temp.path().join("home"))
        .env("UNOSDK_MACHINE_DIR", temp.path().join("machine"))
        .env("SHELL", "/bin/bash")
        .env_remove("UNOSDK_LOG");
    cmd
}

// -----------------------------------------------------------------------------
// Help
// -----------------------------------------------------------------------------

#[test]
fn help_shows_available_commands() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("unosdk"));
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("switch"))
        .stdout(predicate::str::contains("uninstall"))
        .stdout(predicate::str::contains("doctor"))
        .stdout(predicate::str::contains("UNOSDK_HOME"));
}

#[test]
fn install_help_shows_options() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("unosdk"));
    cmd.args(["install", "--help"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--arch"))
        .stdout(predicate::str::contains("--skip-env"))
        .stdout(predicate::str::contains("--no-home"));
}

#[test]
fn missing_subcommand_fails() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("unosdk"));

    cmd.assert().failure();
}

// -----------------------------------------------------------------------------
// List / Versions
// -----------------------------------------------------------------------------

#[test]
fn list_shows_no_toolchains_message() {
    let temp = assert_fs::TempDir::new().unwrap();

    unosdk(&temp)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No toolchains installed"));
}

#[test]
fn list_available_shows_builtin_providers() {
    let temp = assert_fs::TempDir::new().unwrap();

    unosdk(&temp)
        .args(["list", "--available"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Available providers"))
        .stdout(predicate::str::contains("openjdk"))
        .stdout(predicate::str::contains("No toolchains installed").not());
}

#[test]
fn versions_lists_catalog() {
    let temp = assert_fs::TempDir::new().unwrap();

    unosdk(&temp)
        .args(["versions", "java", "openjdk"])
        .assert()
        .success()
        .stdout(predicate::str::contains("17.0.9"))
        .stdout(predicate::str::contains("latest"));
}

#[test]
fn versions_unknown_provider_fails() {
    let temp = assert_fs::TempDir::new().unwrap();

    unosdk(&temp)
        .args(["versions", "java", "nosuchvendor"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("provider not found"))
        .stderr(predicate::str::contains("openjdk"));
}

// -----------------------------------------------------------------------------
// Install / Switch / Uninstall errors
// -----------------------------------------------------------------------------

#[test]
fn install_unknown_provider_fails() {
    let temp = assert_fs::TempDir::new().unwrap();

    unosdk(&temp)
        .args(["install", "java", "nosuchvendor", "17.0.9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("provider not found"));
}

#[test]
fn install_unlisted_version_fails_before_download() {
    let temp = assert_fs::TempDir::new().unwrap();

    unosdk(&temp)
        .args(["install", "java", "openjdk", "99.0.0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid version"));

    temp.child("root/registry.json")
        .assert(predicate::path::missing());
}

#[test]
fn install_rejects_unknown_arch() {
    let temp = assert_fs::TempDir::new().unwrap();

    unosdk(&temp)
        .args(["install", "java", "openjdk", "17.0.9", "--arch", "sparc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown architecture"));
}

#[test]
fn switch_not_installed_fails() {
    let temp = assert_fs::TempDir::new().unwrap();

    unosdk(&temp)
        .args(["switch", "java", "openjdk", "17.0.9"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("not installed"))
        .stderr(predicate::str::contains(
            "unosdk install java openjdk 17.0.9",
        ));
}

#[test]
fn uninstall_not_installed_fails() {
    let temp = assert_fs::TempDir::new().unwrap();

    unosdk(&temp)
        .args(["uninstall", "node", "nodejs", "20.10.0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not installed"));
}

// -----------------------------------------------------------------------------
// Configuration and inventory errors
// -----------------------------------------------------------------------------

#[test]
fn corrupt_inventory_is_reported() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("root/registry.json").write_str("{ not json").unwrap();

    unosdk(&temp)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("corrupt"));
}

#[test]
fn malformed_config_is_reported() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("root/config.toml")
        .write_str("download_retries = \"many\"\n")
        .unwrap();

    unosdk(&temp)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid configuration"));
}

// -----------------------------------------------------------------------------
// Doctor
// -----------------------------------------------------------------------------

#[test]
fn doctor_passes_on_empty_state() {
    let temp = assert_fs::TempDir::new().unwrap();

    unosdk(&temp)
        .arg("doctor")
        .assert()
        .success()
        .stdout(predicate::str::contains("[OK] Install directories"))
        .stdout(predicate::str::contains("All checks passed"));
}

#[test]
fn doctor_flags_missing_install_directory() {
    let temp = assert_fs::TempDir::new().unwrap();
    let missing = temp.path().join("root/sdks/java/openjdk/17.0.9/jdk-17.0.9+9");
    seed_inventory(&temp, "java", "openjdk", "17.0.9", &missing);

    unosdk(&temp)
        .arg("doctor")
        .assert()
        .success()
        .stdout(predicate::str::contains("[FAIL] Install directories"))
        .stdout(predicate::str::contains(
            "unosdk uninstall java openjdk 17.0.9",
        ));
}

// -----------------------------------------------------------------------------
// Environment round trip (Unix profile backend)
// -----------------------------------------------------------------------------

#[cfg(unix)]
#[test]
fn switch_list_uninstall_round_trip() {
    let temp = assert_fs::TempDir::new().unwrap();
    let install = temp.child("root/sdks/java/openjdk/17.0.9/jdk-17.0.9+9");
    install.child("bin/java").write_str("#!/bin/sh\n").unwrap();
    seed_inventory(&temp, "java", "openjdk", "17.0.9", install.path());

    unosdk(&temp)
        .args(["switch", "java", "openjdk", "17.0.9"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Switched to java openjdk 17.0.9"));

    let script = std::fs::read_to_string(temp.path().join("root/env/unosdk.sh")).unwrap();
    assert!(script.contains(&format!("export JAVA_HOME='{}'", install.path().display())));
    assert!(script.contains(&format!("{}", install.path().join("bin").display())));

    unosdk(&temp)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("* java"));

    unosdk(&temp)
        .args(["uninstall", "java", "openjdk", "17.0.9"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Uninstalled java openjdk 17.0.9"))
        .stdout(predicate::str::contains("It was the active java."));

    install.assert(predicate::path::missing());
    let script = std::fs::read_to_string(temp.path().join("root/env/unosdk.sh")).unwrap();
    assert!(!script.contains("JAVA_HOME"));

    unosdk(&temp)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No toolchains installed"));
}

/// Writes a one-record inventory, as `install` would have left it.
fn seed_inventory(
    temp: &assert_fs::TempDir,
    kind: &str,
    provider: &str,
    version: &str,
    install_path: &std::path::Path,
) {
    let key = format!("{kind}:{provider}:{version}");
    let inventory = serde_json::json!({
        key: {
            "kind": kind,
            "provider": provider,
            "version": version,
            "install_path": install_path,
            "download_url": "https://downloads.test/archive.tar.gz",
            "installed": true,
            "installed_at": "2026-01-05T10:12:44Z",
        }
    });
    temp.child("root/registry.json")
        .write_str(&inventory.to_string())
        .unwrap();
}
