//! End-to-end runs of the `invoke` binary against throwaway shell scripts.
#![cfg(unix)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::{self, File};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::time::{Duration, UNIX_EPOCH};

fn touch(dir: &Path, name: &str, secs: u64) {
    let f = File::create(dir.join(name)).unwrap();
    f.set_modified(UNIX_EPOCH + Duration::from_secs(secs)).unwrap();
}

fn write_script(dir: &Path, name: &str, body: &str) {
    let p = dir.join(name);
    fs::write(&p, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&p, fs::Permissions::from_mode(0o755)).unwrap();
}

/// tmp/{an.R, run1/{a.txt, b.txt, out.txt, skip.csv}}
fn workspace(body: &str) -> tempfile::TempDir {
    let tmp = tempfile::tempdir().unwrap();
    write_script(tmp.path(), "an.R", body);
    let run1 = tmp.path().join("run1");
    fs::create_dir(&run1).unwrap();
    touch(&run1, "b.txt", 300);
    touch(&run1, "out.txt", 50);
    touch(&run1, "a.txt", 100);
    touch(&run1, "skip.csv", 10);
    tmp
}

fn invoke(cwd: &Path) -> Command {
    let mut cmd = Command::cargo_bin("invoke").unwrap();
    cmd.current_dir(cwd);
    cmd
}

const PRINT_ARGS: &str = "printf '%s\\n' \"$@\"";

#[test]
fn no_arguments_prints_usage() {
    let tmp = tempfile::tempdir().unwrap();
    invoke(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn runs_script_directly_with_ordered_files() {
    let tmp = workspace(PRINT_ARGS);
    invoke(tmp.path())
        .args(["an", "--folder", "run1", "--folder-prefix"])
        .assert()
        .success()
        .stdout("run1/\nrun1/a.txt\nrun1/b.txt\n");
}

#[test]
fn reference_goes_first() {
    let tmp = workspace(PRINT_ARGS);
    invoke(tmp.path())
        .args(["an.R", "height", "run1", "--interpreter", "sh"])
        .assert()
        .success()
        .stdout("height.txt\nrun1/a.txt\nrun1/b.txt\n");
}

#[test]
fn each_mode_calls_once_per_file() {
    let tmp = workspace("echo \"call $#: $1\"");
    invoke(tmp.path())
        .args(["an", "--folder", "run1", "--mode", "each", "--interpreter", "sh"])
        .assert()
        .success()
        .stdout("call 1: run1/a.txt\ncall 1: run1/b.txt\n");
}

#[test]
fn default_folder_is_the_working_directory() {
    let tmp = workspace(PRINT_ARGS);
    let run1 = tmp.path().join("run1");
    fs::copy(tmp.path().join("an.R"), run1.join("an.R")).unwrap();

    invoke(&run1)
        .args(["an", "--interpreter", "sh"])
        .assert()
        .success()
        .stdout("run1/a.txt\nrun1/b.txt\n");
}

#[test]
fn in_folder_stages_and_removes_script() {
    let tmp = workspace("basename \"$(pwd)\"\nprintf '%s\\n' \"$@\"");
    invoke(tmp.path())
        .args(["an", "--folder", "run1", "--in-folder"])
        .assert()
        .success()
        .stdout("run1\na.txt\nb.txt\n");

    assert!(!tmp.path().join("run1").join("an.R").exists());
    assert!(tmp.path().join("an.R").exists());
}

#[test]
fn in_folder_keep_script_leaves_copy() {
    let tmp = workspace("exit 0");
    invoke(tmp.path())
        .args(["an", "--folder", "run1", "--in-folder", "--keep-script"])
        .assert()
        .success();
    assert!(tmp.path().join("run1").join("an.R").exists());
}

#[test]
fn failing_script_propagates_exit_code_and_output() {
    let tmp = workspace("echo 'model did not converge' >&2\nexit 3");
    invoke(tmp.path())
        .args(["an", "--folder", "run1", "--interpreter", "sh"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("model did not converge"));
}

#[test]
fn missing_script_is_a_launch_failure() {
    let tmp = workspace(PRINT_ARGS);
    invoke(tmp.path())
        .args(["nothere", "--folder", "run1"])
        .assert()
        .code(127)
        .stderr(predicate::str::contains("cannot launch"));
}

#[test]
fn missing_folder_is_a_configuration_failure() {
    let tmp = workspace(PRINT_ARGS);
    invoke(tmp.path())
        .args(["an", "--folder", "run9"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("configuration error"));
}

#[test]
fn yaml_config_is_applied() {
    let tmp = workspace(PRINT_ARGS);
    touch(&tmp.path().join("run1"), "c.csv", 200);
    fs::write(
        tmp.path().join("batch.yaml"),
        "extension: .csv\nexclude: []\ninterpreter: sh\n",
    )
    .unwrap();

    invoke(tmp.path())
        .args(["an", "--folder", "run1"])
        .assert()
        .success()
        .stdout("run1/skip.csv\nrun1/c.csv\n");
}

#[test]
fn dry_run_json_does_not_launch() {
    let tmp = workspace("touch ran\nexit 0");
    let out = invoke(tmp.path())
        .args(["an", "plot", "run1", "--folder-prefix", "--dry-run", "--json"])
        .output()
        .unwrap();
    assert!(out.status.success());

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(
        v["invocations"][0]["working_arguments"],
        serde_json::json!(["run1/", "plot.txt", "run1/a.txt", "run1/b.txt"])
    );
    assert_eq!(v["folder"], "run1");
    assert!(!tmp.path().join("ran").exists());
}
