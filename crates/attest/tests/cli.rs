//! End-to-end tests for the `attest` binary.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;

const PASSING: &str = "``` {#input .markdown}\nhello *world*\n```\n\n\
                       ``` {#expected .markdown}\nhello *world*\n```\n";
const FAILING: &str = "``` {#input .markdown}\nhello *world*\n```\n\n\
                       ``` {#expected .markdown}\ngoodbye\n```\n";

fn attest() -> Command {
    Command::cargo_bin("attest").unwrap()
}

#[test]
fn passing_file_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("t.md");
    fs::write(&path, PASSING).unwrap();

    attest()
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 passed"));
}

#[test]
fn failing_file_exits_one_with_a_diff() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("t.md");
    fs::write(&path, FAILING).unwrap();

    attest()
        .arg(&path)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("FAIL"))
        .stderr(predicate::str::contains("--- expected"));
}

#[test]
fn directory_run_continues_past_broken_tests() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a_pass.md"), PASSING).unwrap();
    fs::write(
        dir.path().join("b_ambiguous.md"),
        "``` {#input}\na\n```\n\n``` {#in}\nb\n```\n",
    )
    .unwrap();
    fs::write(dir.path().join("c_pass.md"), PASSING).unwrap();

    attest()
        .arg(dir.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("2 passed"))
        .stderr(predicate::str::contains("ambiguous"));
}

#[test]
fn accept_rewrites_and_the_rerun_passes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("t.md");
    fs::write(&path, FAILING).unwrap();

    attest()
        .arg("--accept")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 accepted"));

    let rewritten = fs::read_to_string(&path).unwrap();
    assert!(rewritten.contains("hello *world*"));
    assert!(!rewritten.contains("goodbye"));

    attest()
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 passed"));
}

#[test]
fn command_test_runs_the_converter_and_passes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("t.md");
    fs::write(
        &path,
        "``` {#input}\nhello *world*\n```\n\n\
         ``` {#command}\nquill --from=markdown --to=html\n```\n\n\
         ``` {#expected}\n<p>hello <em>world</em></p>\n```\n",
    )
    .unwrap();

    // The converter binary must be reachable by name.
    let quill = assert_cmd::cargo::cargo_bin("quill");
    let search_path = std::env::join_paths(
        quill
            .parent()
            .map(std::path::Path::to_path_buf)
            .into_iter()
            .chain(std::env::split_paths(
                &std::env::var_os("PATH").unwrap_or_default(),
            )),
    )
    .unwrap();

    attest()
        .env("PATH", &search_path)
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 passed"));
}

#[test]
fn group_options_apply_to_the_whole_directory() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("t.md"), PASSING).unwrap();
    fs::write(dir.path().join("_options.md"), "disable: true\n").unwrap();

    attest()
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("1 disabled"));
}

#[test]
fn missing_path_exits_two() {
    attest()
        .arg("/no/such/path/anywhere")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("cannot run tests"));
}
