//! Integration tests for the littlelang binary: output, diagnostics, and
//! exit codes.

use assert_cmd::Command;
use predicates::prelude::*;

fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"))
}

fn littlelang() -> Command {
    Command::cargo_bin("littlelang").unwrap()
}

#[test]
fn runs_a_program() {
    littlelang()
        .arg(fixture("hello.ll"))
        .assert()
        .success()
        .stdout("hello, world\n");
}

#[test]
fn closures_work_end_to_end() {
    littlelang()
        .arg(fixture("adder.ll"))
        .assert()
        .success()
        .stdout("8\n");
}

#[test]
fn extra_arguments_reach_the_program() {
    littlelang()
        .arg(fixture("args.ll"))
        .arg("one")
        .arg("2")
        .arg("THREE")
        .assert()
        .success()
        .stdout("one\n2\nTHREE\n");
}

#[test]
fn reads_stdin() {
    littlelang()
        .arg(fixture("echo_stdin.ll"))
        .write_stdin("from stdin")
        .assert()
        .success()
        .stdout("FROM STDIN\n");
}

#[test]
fn runtime_error_prints_caret_diagnostic() {
    littlelang()
        .arg(fixture("subscript_error.ll"))
        .assert()
        .code(1)
        .stdout(predicate::str::contains(
            "value error at 2:5: subscript -1 out of range",
        ))
        .stdout(predicate::str::contains("lst[-1]\n    ^\n"));
}

#[test]
fn parse_error_sets_exit_code() {
    littlelang()
        .arg(fixture("parse_error.ll"))
        .assert()
        .code(1)
        .stdout(predicate::str::contains("parse error at "))
        .stdout(predicate::str::contains("expected expression, not EOF"));
}

#[test]
fn exit_builtin_sets_exit_code() {
    littlelang()
        .arg(fixture("exit_code.ll"))
        .assert()
        .code(3)
        .stdout("about to exit\n");
}

#[test]
fn missing_source_file() {
    littlelang()
        .arg(fixture("no_such_program.ll"))
        .assert()
        .code(1)
        .stdout(predicate::str::contains("error reading"));
}

#[test]
fn stats_flag_reports_counts() {
    littlelang()
        .arg("--stats")
        .arg(fixture("hello.ll"))
        .assert()
        .success()
        .stdout(predicate::str::contains("hello, world\n"))
        .stdout(predicate::str::contains(" elapsed: "))
        .stdout(predicate::str::contains("builtin calls"))
        .stdout(predicate::str::contains("user calls"));
}
