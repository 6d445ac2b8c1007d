use std::process::{Command, Output};

fn evaldemo(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_evaldemo"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run evaldemo")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn greets_the_world_by_default() {
    let output = evaldemo(&[]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "Hello, World!\n");
}

#[test]
fn greets_by_name() {
    let output = evaldemo(&["hello", "Tester"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "Hello, Tester!\n");
}

#[test]
fn literal_prints_the_repr() {
    let output = evaldemo(&["literal", "{'a': [1, 2.0, None]}"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "{'a': [1, 2.0, None]}\n");
}

#[test]
fn literal_rejects_expressions() {
    let output = evaldemo(&["literal", "1 + 1"]);
    assert!(!output.status.success());
    assert_eq!(stdout(&output), "");
    assert!(stderr(&output).contains("is not a literal"), "{}", stderr(&output));
}

#[test]
fn eval_prints_the_result() {
    let output = evaldemo(&["eval", "1 + 1"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "2\n");
}

#[test]
fn eval_failure_exits_non_zero() {
    let output = evaldemo(&["eval", "1 / 0"]);
    assert!(!output.status.success());
    assert_eq!(stdout(&output), "");
    assert!(stderr(&output).contains("division by zero"), "{}", stderr(&output));
}

#[test]
fn max_depth_applies_to_both_parsers() {
    let nested = "[[[1]]]";
    assert!(evaldemo(&["literal", nested]).status.success());
    assert!(!evaldemo(&["--max-depth", "1", "literal", nested]).status.success());
    assert!(!evaldemo(&["eval", "--max-depth", "1", nested]).status.success());
}
