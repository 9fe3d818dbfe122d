//! Integration tests for the wordscan CLI

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn corpus() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("src/util")).unwrap();
    fs::write(dir.path().join("src/Main.java"), "volatile int a;\nvolatile int b;\n").unwrap();
    fs::write(dir.path().join("src/util/Lock.java"), "private volatile boolean held;\n").unwrap();
    fs::write(dir.path().join("README"), "nothing here\n").unwrap();
    dir
}

/// Isolated command: no user config, no inherited overrides
fn wordscan(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("wordscan").unwrap();
    cmd.env("HOME", home.path())
        .env_remove("RUST_LOG")
        .env_remove("WORDSCAN_POOL__MAX_WORKERS")
        .env_remove("WORDSCAN_REPORT__FORMAT")
        .current_dir(home.path());
    cmd
}

#[test]
fn test_cli_help() {
    let home = TempDir::new().unwrap();
    wordscan(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("count"))
        .stdout(predicate::str::contains("search"));
}

#[test]
fn test_cli_version() {
    let home = TempDir::new().unwrap();
    wordscan(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("wordscan"));
}

#[test]
fn test_count_reports_occurrences() {
    let dir = corpus();
    wordscan(&dir)
        .args(["count", "src", "volatile"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Occurrences of volatile: 3"))
        .stdout(predicate::str::contains("Time elapsed:"))
        .stdout(predicate::str::contains("Largest pool size:"))
        .stdout(predicate::str::contains("occurs in").not());
}

#[test]
fn test_search_finds_a_file() {
    let dir = corpus();
    wordscan(&dir)
        .args(["search", "src", "volatile"])
        .assert()
        .success()
        .stdout(predicate::str::contains("volatile occurs in:"))
        .stdout(predicate::str::contains(".java"))
        .stdout(predicate::str::contains("Search time:"));
}

#[test]
fn test_search_not_found_still_succeeds() {
    let dir = corpus();
    wordscan(&dir)
        .args(["search", ".", "synchronized"])
        .assert()
        .success()
        .stdout(predicate::str::contains("synchronized not found"));
}

#[test]
fn test_missing_directory_fails() {
    let dir = TempDir::new().unwrap();
    wordscan(&dir)
        .args(["count", "does-not-exist", "word"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does-not-exist"));
}

#[test]
fn test_json_report() {
    let dir = corpus();
    let assert = wordscan(&dir)
        .args(["-q", "run", "--dir", "src", "--word", "volatile", "--format", "json"])
        .assert()
        .success();

    let report: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(report["keyword"], "volatile");
    assert_eq!(report["files"], 2);
    assert_eq!(report["count"]["occurrences"], 3);
    assert!(report["search"]["found"].is_string());
    assert!(report["pool"]["largest_pool_size"].as_u64().unwrap() >= 1);
}

#[test]
fn test_run_reads_answers_from_stdin() {
    let dir = corpus();
    wordscan(&dir)
        .arg("run")
        .write_stdin("src\nvolatile\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Occurrences of volatile: 3"))
        .stdout(predicate::str::contains("volatile occurs in:"))
        .stdout(predicate::str::contains("Peak concurrency:"));
}

#[test]
fn test_default_command_is_run() {
    let dir = corpus();
    wordscan(&dir)
        .write_stdin("src\nint\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Occurrences of int: 2"));
}

#[test]
fn test_run_without_input_fails() {
    let dir = corpus();
    wordscan(&dir).arg("run").write_stdin("").assert().failure();
}

#[test]
fn test_global_directory_flag() {
    let dir = corpus();
    let home = TempDir::new().unwrap();
    wordscan(&home)
        .arg("-C")
        .arg(dir.path())
        .args(["count", "src", "boolean"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Occurrences of boolean: 1"));
}

#[test]
fn test_config_file_is_applied() {
    let dir = corpus();
    fs::write(dir.path().join("custom.toml"), "[pool]\nmax_workers = 1\n").unwrap();
    let assert = wordscan(&dir)
        .args(["--config", "custom.toml", "run", "--dir", "src", "--word", "volatile"])
        .args(["--format", "json"])
        .assert()
        .success();

    let report: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(report["pool"]["largest_pool_size"], 1);
    assert_eq!(report["pool"]["peak_concurrency"], 1);
}

#[test]
fn test_environment_sets_report_format() {
    let dir = corpus();
    let assert = wordscan(&dir)
        .env("WORDSCAN_REPORT__FORMAT", "json")
        .args(["count", "src", "volatile"])
        .assert()
        .success();

    let report: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(report["count"]["occurrences"], 3);
}

#[test]
fn test_config_show() {
    let home = TempDir::new().unwrap();
    wordscan(&home)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[pool]"))
        .stdout(predicate::str::contains("idle_timeout_ms"));

    wordscan(&home)
        .args(["config", "show", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"report\""));
}

#[test]
fn test_config_validate_rejects_bad_pool() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("wordscan.toml"), "[pool]\nmin_workers = 4\nmax_workers = 2\n").unwrap();
    wordscan(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("min_workers"));
}
