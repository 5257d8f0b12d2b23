//! `pulsed --help` / `--version` specs.

use crate::prelude::*;
use std::process::Command;

fn pulsed() -> Command {
    Command::new(pulsed_binary())
}

#[test]
fn help_flag_prints_usage() {
    let output = pulsed().arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("USAGE"));
    assert!(stdout.contains("pulsed"));
}

#[test]
fn version_flag_prints_cargo_version() {
    let output = pulsed().arg("--version").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("pulsed "));
}

#[test]
fn short_help_flag_matches_long_form() {
    let output = pulsed().arg("-h").output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("USAGE"));
}

#[test]
fn unexpected_argument_fails_with_usage_hint() {
    let output = pulsed().arg("--bogus").output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unexpected argument"));
    assert!(stderr.contains("Usage: pulsed"));
}
