//! Drives the built `picoc` binary end to end: write a small C source file
//! with `tempfile`, run it, and check stdout/exit code. This is the one
//! place the CLI's argument parsing and exit-code propagation (spec.md §1's
//! "deliberately out of scope" driver) actually get exercised, since the
//! engine crates' own tests call `picoc-interp` directly and never go
//! through `main`.

use std::io::Write as _;
use std::process::Command;

fn picoc() -> Command {
    Command::new(env!("CARGO_BIN_EXE_picoc"))
}

fn write_source(contents: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::Builder::new().suffix(".c").tempfile().expect("create temp source file");
    f.write_all(contents.as_bytes()).expect("write temp source file");
    f
}

#[test]
fn runs_main_and_propagates_its_return_value() {
    let file = write_source(r#"int main(){ printf("%d\n", 1+2*3); return 0; }"#);
    let output = picoc().arg(file.path()).output().expect("run picoc");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "7\n");
}

#[test]
fn exit_code_matches_mains_return_value() {
    let file = write_source("int main(){ return 5; }");
    let output = picoc().arg(file.path()).output().expect("run picoc");
    assert_eq!(output.status.code(), Some(5));
}

#[test]
fn script_mode_runs_top_level_initializers_without_calling_main() {
    // Top-level statements run as they're parsed (spec: no separate
    // compile-then-run phase), so a global initializer's side effect is
    // visible even though `-s` never calls `main`.
    let file = write_source(r#"int ran = printf("ran without a main\n"); int main(){ printf("main ran too\n"); return 0; }"#);
    let output = picoc().arg("-s").arg(file.path()).output().expect("run picoc");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "ran without a main\n");
}

#[test]
fn runtime_errors_exit_nonzero_and_report_position() {
    let file = write_source("int main(){ return undeclared_name; }");
    let output = picoc().arg(file.path()).output().expect("run picoc");
    assert!(!output.status.success());
    assert!(!output.stderr.is_empty());
}

#[test]
fn copyright_flag_prints_and_exits_zero() {
    let output = picoc().arg("-c").output().expect("run picoc");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("picoc"));
}
