//! Driver tests: stdin/file input, stdout/stderr split, exit codes.

use assert_cmd::Command;
use predicates::prelude::*;

fn gracec() -> Command {
    Command::cargo_bin("gracec").unwrap()
}

#[test]
fn compiles_from_stdin_to_stdout() {
    gracec()
        .write_stdin("fun prog() : nothing { writeInteger(42); }")
        .assert()
        .success()
        .stdout(predicate::str::contains("define i64 @main()"))
        .stdout(predicate::str::contains("x86_64-pc-linux-gnu"));
}

#[test]
fn compiles_from_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hello.grc");
    std::fs::write(&path, "fun prog() : nothing { writeString(\"hi\\n\"); }").unwrap();

    gracec()
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("call void @writeString"));
}

#[test]
fn parse_errors_exit_nonzero_with_diagnostics_on_stderr() {
    gracec()
        .write_stdin("fun prog() : nothing { x <- ; }")
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("parse error"));
}

#[test]
fn semantic_errors_exit_nonzero_with_diagnostics_on_stderr() {
    gracec()
        .write_stdin("fun prog() : nothing { x <- 1; }")
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("semantic error"))
        .stderr(predicate::str::contains("undeclared"));
}

#[test]
fn missing_file_exits_nonzero() {
    gracec().arg("/no/such/file.grc").assert().failure();
}

#[test]
fn optimize_flag_is_accepted() {
    gracec()
        .arg("-O")
        .write_stdin(
            "fun prog() : nothing \
               var i : int; \
             { i <- 0; while i < 10 do { writeInteger(i * i); i <- i + 1; } }",
        )
        .assert()
        .success()
        .stdout(predicate::str::contains("define i64 @main()"));
}
