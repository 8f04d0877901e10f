//! Binary-level tests for the dirsync command line.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::tempdir;

fn dirsync() -> Command {
    let mut cmd = Command::cargo_bin("dirsync").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

fn write_settings(root: &Path, side: u8) -> std::path::PathBuf {
    let folder = root.join(format!("folder-{side}"));
    std::fs::create_dir_all(&folder).unwrap();
    let path = root.join(format!("side-{side}.toml"));
    std::fs::write(
        &path,
        format!(
            r#"
side = {side}
folder = "folder-{side}"
manifest = "state/manifest-{side}.json"
exchange_dir = "exchange"

[envelope]
mode = "plain"
"#
        ),
    )
    .unwrap();
    path
}

#[test]
fn help_lists_commands() {
    dirsync()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("push"))
        .stdout(predicate::str::contains("keygen"));
}

#[test]
fn missing_settings_file_fails() {
    let dir = tempdir().unwrap();
    dirsync()
        .args(["status", "--settings"])
        .arg(dir.path().join("absent.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read settings file"));
}

#[test]
fn push_before_init_fails() {
    let dir = tempdir().unwrap();
    let settings = write_settings(dir.path(), 1);
    dirsync()
        .arg("push")
        .arg("--settings")
        .arg(&settings)
        .assert()
        .failure()
        .stderr(predicate::str::contains("run init first"));
}

#[test]
fn init_push_pull_between_sides() {
    let dir = tempdir().unwrap();
    let one = write_settings(dir.path(), 1);
    let two = write_settings(dir.path(), 2);

    for settings in [&one, &two] {
        dirsync()
            .arg("init")
            .arg("--settings")
            .arg(settings)
            .assert()
            .success();
    }

    std::fs::write(dir.path().join("folder-1/hello.txt"), "hi").unwrap();

    dirsync()
        .args(["push", "--settings"])
        .arg(&one)
        .assert()
        .success()
        .stdout(predicate::str::contains("Added:      1"))
        .stdout(predicate::str::contains("Push successful!"));

    dirsync()
        .args(["pull", "--settings"])
        .arg(&two)
        .assert()
        .success()
        .stdout(predicate::str::contains("Added:    1"));

    assert_eq!(
        std::fs::read_to_string(dir.path().join("folder-2/hello.txt")).unwrap(),
        "hi"
    );

    dirsync()
        .args(["pull", "--settings"])
        .arg(&two)
        .assert()
        .success()
        .stdout(predicate::str::contains("No updates."));
}
