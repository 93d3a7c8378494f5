//! CLI surface tests. Network-free: only store-local subcommands.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn bakelite(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("bakelite").unwrap();
    cmd.arg("--home").arg(home.path());
    cmd
}

#[test]
fn test_images_on_empty_store() {
    let home = TempDir::new().unwrap();
    bakelite(&home)
        .arg("images")
        .assert()
        .success()
        .stdout(predicate::str::contains("REFERENCE"));
}

#[test]
fn test_rm_unknown_image_fails() {
    let home = TempDir::new().unwrap();
    bakelite(&home)
        .args(["rm", "ghost:latest"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_run_unknown_image_fails() {
    let home = TempDir::new().unwrap();
    bakelite(&home)
        .args(["run", "ghost"])
        .assert()
        .failure();
}

#[test]
fn test_build_requires_tag() {
    let home = TempDir::new().unwrap();
    bakelite(&home).arg("build").assert().failure();
}

#[test]
fn test_build_rejects_missing_context() {
    let home = TempDir::new().unwrap();
    bakelite(&home)
        .args(["build", "-t", "app"])
        .arg(home.path().join("no-such-context"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("build context"));
}
