use std::fs;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::tempdir;

fn scout() -> Command {
    let mut cmd = Command::cargo_bin("thread-scout").expect("thread-scout binary");
    cmd.env_remove("THREAD_SCOUT_CRAWL__TERMS")
        .env_remove("THREAD_SCOUT_CRAWL__BOARDS")
        .env_remove("THREAD_SCOUT_CRAWL__BASE_URL");
    cmd
}

#[test]
fn prints_version() {
    scout()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn prints_help() {
    scout()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("thread-scout"))
        .stdout(predicate::str::contains("--once"));
}

#[test]
fn rejects_unknown_arguments() {
    scout()
        .arg("--bogus")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown argument"));
}

#[test]
fn check_config_prints_effective_settings() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    fs::write(&path, "crawl:\n  boards: [g]\n  terms: [rust, Zig]\n  pages: 2\n  workers: 3\n").unwrap();

    scout()
        .arg("--config")
        .arg(&path)
        .arg("--check-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("rust"))
        .stdout(predicate::str::contains("1 boards x 2 pages, 2 terms, 3 workers"));
}

#[test]
fn check_config_rejects_empty_terms() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    fs::write(&path, "crawl:\n  terms: []\n").unwrap();

    scout()
        .arg("--config")
        .arg(&path)
        .arg("--check-config")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("crawl.terms"));
}

#[test]
fn once_reports_connectivity_failure() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    fs::write(
        &path,
        "crawl:\n  base_url: http://127.0.0.1:9\n  boards: [x]\n  terms: [foo]\n  pages: 1\n  timeout: 5s\n",
    )
    .unwrap();

    scout()
        .arg("--config")
        .arg(&path)
        .arg("--log-file")
        .arg(dir.path().join("scout.log"))
        .arg("--once")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("sweep aborted"));
}
