//! Smoke tests -- verify the binary runs and the browser-free commands work.

use assert_cmd::Command;
use predicates::prelude::*;

fn config_in(dir: &tempfile::TempDir, extra: &str) -> std::path::PathBuf {
    let path = dir.path().join("wifi-curfew.toml");
    let creds = dir.path().join("credentials.txt");
    std::fs::write(
        &path,
        format!("[credentials]\npath = {:?}\n{}", creds.display().to_string(), extra),
    )
    .unwrap();
    path
}

#[test]
fn test_cli_help() {
    Command::cargo_bin("wifi-curfew")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicates::str::contains("modem's web admin console"));
}

#[test]
fn test_cli_version() {
    Command::cargo_bin("wifi-curfew")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicates::str::contains("wifi-curfew"));
}

#[test]
fn test_run_subcommand_exists() {
    Command::cargo_bin("wifi-curfew")
        .unwrap()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicates::str::contains("--state"));
}

#[test]
fn test_run_rejects_unknown_state() {
    Command::cargo_bin("wifi-curfew")
        .unwrap()
        .args(["run", "--state", "standby"])
        .assert()
        .failure();
}

#[test]
fn test_schedule_dry_run_lists_both_triggers() {
    let dir = tempfile::TempDir::new().unwrap();
    let cfg = config_in(&dir, "[schedule]\noff_at = \"22:00\"\non_at = \"06:15\"\n");

    Command::cargo_bin("wifi-curfew")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .args(["schedule", "dry-run", "--hours", "24"])
        .assert()
        .success()
        .stdout(predicates::str::contains("wifi-off (OFF)"))
        .stdout(predicates::str::contains("wifi-on (ON)"));
}

#[test]
fn test_invalid_config_is_fatal() {
    let dir = tempfile::TempDir::new().unwrap();
    let cfg = config_in(&dir, "[schedule]\noff_at = \"late\"\n");

    Command::cargo_bin("wifi-curfew")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .args(["schedule", "dry-run"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("schedule.off_at"));
}

#[test]
fn test_check_credentials_missing_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let cfg = config_in(&dir, "");

    Command::cargo_bin("wifi-curfew")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("check-credentials")
        .assert()
        .failure()
        .stderr(predicates::str::contains("not found"));
}

#[test]
fn test_check_credentials_ok_hides_password() {
    let dir = tempfile::TempDir::new().unwrap();
    let cfg = config_in(&dir, "");
    std::fs::write(dir.path().join("credentials.txt"), "s3cret-pass\nhttp://10.0.0.1\n").unwrap();

    Command::cargo_bin("wifi-curfew")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("check-credentials")
        .assert()
        .success()
        .stdout(predicates::str::contains("http://10.0.0.1"))
        .stdout(predicates::str::contains("s3cret-pass").not());
}

#[test]
fn test_broken_env_config_warns_and_falls_back() {
    let dir = tempfile::TempDir::new().unwrap();
    let cfg = config_in(&dir, "[schedule]\noff_at = \"late\"\n");

    Command::cargo_bin("wifi-curfew")
        .unwrap()
        .current_dir(dir.path())
        .env("WIFI_CURFEW_CONFIG", &cfg)
        .env_remove("RUST_LOG")
        .args(["schedule", "dry-run"])
        .assert()
        .success()
        .stdout(predicates::str::contains("could not be loaded"))
        .stdout(predicates::str::contains("schedule.off_at"))
        .stdout(predicates::str::contains("wifi-off (OFF)"));
}

#[test]
fn test_schedule_dry_run_rejects_huge_window() {
    Command::cargo_bin("wifi-curfew")
        .unwrap()
        .args(["schedule", "dry-run", "--hours", "5000000000"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicates::str::contains("--hours"))
        .stderr(predicates::str::contains("panicked").not());
}
