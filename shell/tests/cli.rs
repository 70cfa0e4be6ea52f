//! End-to-end tests driving the `pipesh` binary.

use std::io::Write;
use std::process::{Command, Output, Stdio};

fn pipesh() -> Command {
    Command::new(env!("CARGO_BIN_EXE_pipesh"))
}

fn run_line(line: &str) -> Output {
    pipesh()
        .args(["-c", line])
        .stdin(Stdio::null())
        .output()
        .unwrap()
}

fn run_session(input: &str) -> Output {
    let mut child = pipesh()
        .args(["--prompt", ""])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn single_line_pipeline() {
    let output = run_line("printf one\\ntwo\\nthree | grep t | wc -l");
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "2");
}

#[test]
fn single_line_failure_sets_exit_status() {
    let output = run_line("no-such-command-for-pipesh");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no-such-command-for-pipesh"));
}

#[test]
fn builtin_short_circuits_pipeline() {
    let output = run_line("cd /tmp | echo hi");
    assert!(output.status.success());
    assert_eq!(stdout(&output), "");
}

#[test]
fn session_keeps_directory_between_lines() {
    let dir = tempfile::tempdir().unwrap();
    let canonical = std::fs::canonicalize(dir.path()).unwrap();
    std::fs::write(canonical.join("note.txt"), "x").unwrap();

    let output = run_session(&format!("cd {}\npwd\nls\nexit\n", canonical.display()));
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains(&format!("{}\n", canonical.display())), "{out:?}");
    assert!(out.contains("note.txt"), "{out:?}");
}

#[test]
fn session_survives_errors_and_ends_on_quit() {
    let output = run_session("cd\nkill nope\n\necho after\nquit\necho never\n");
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("after"), "{out:?}");
    assert!(!out.contains("never"), "{out:?}");

    let err = String::from_utf8_lossy(&output.stderr);
    assert!(err.contains("cd: missing argument"), "{err:?}");
    assert!(err.contains("kill: invalid PID: nope"), "{err:?}");
}

#[test]
fn end_of_input_exits_cleanly() {
    let output = run_session("echo last\n");
    assert!(output.status.success());
    assert!(stdout(&output).contains("last"));
}
