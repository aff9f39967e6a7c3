//! The wrapper binary: record, report, then run or simulate.

use super::common::sandbox::{list_files, read_json, Sandbox};
use predicates::prelude::*;
use serde_json::json;

#[test]
fn test_simulate_writes_step_and_report_without_running() {
    let sandbox = Sandbox::new();

    sandbox
        .wrapper()
        .arg("--simulate")
        .arg("--report-dir")
        .arg(sandbox.report_dir())
        .args(["--field", "dry_run_nix_json=true"])
        .args(["rustc_0", "--version"])
        .env("TEST_VAR", "test_value_0")
        .assert()
        .success()
        .stdout("");

    assert!(sandbox.step_dir("001").join("flake.nix").is_file());

    let reports = sandbox.reports();
    assert_eq!(reports.len(), 1, "Expected one report, got {reports:?}");
    assert!(reports[0].starts_with("stepwrap_dry_run_"));
    assert!(reports[0].ends_with(".json"));

    let report = read_json(&sandbox.report_dir().join(&reports[0]));
    assert_eq!(report["command"], "rustc_0");
    assert_eq!(report["arguments"], json!(["--version"]));
    assert_eq!(report["environment"]["TEST_VAR"], "test_value_0");
    assert_eq!(report["dry_run_nix_json"], true);
}

#[test]
fn test_simulate_without_report_dir_uses_data_dir() {
    let sandbox = Sandbox::new();

    sandbox
        .wrapper()
        .args(["--simulate", "--no-record", "rustc_0", "--version"])
        .env("TEST_VAR", "test_value_0")
        .assert()
        .success()
        .stdout("");

    let reports_dir = sandbox.data_dir().join("reports");
    let reports = list_files(&reports_dir);
    assert_eq!(reports.len(), 1, "Expected one report, got {reports:?}");

    let report = read_json(&reports_dir.join(&reports[0]));
    assert_eq!(report["command"], "rustc_0");
    assert_eq!(report["arguments"], json!(["--version"]));
    assert_eq!(report["environment"]["TEST_VAR"], "test_value_0");
}

#[test]
fn test_execute_without_report_dir_writes_no_report() {
    let sandbox = Sandbox::new();

    sandbox
        .wrapper()
        .args(["--no-record", "does-not-exist-stepwrap-test"])
        .assert()
        .code(127);

    assert!(!sandbox.data_dir().join("reports").exists());
}

#[test]
fn test_bare_rust_log_level_is_honoured() {
    let sandbox = Sandbox::new();

    sandbox
        .wrapper()
        .args(["--simulate", "rustc"])
        .env("RUST_LOG", "info")
        .assert()
        .success();

    let log = std::fs::read_to_string(sandbox.data_dir().join("logs").join("stepwrap.log"))
        .expect("log file should exist");
    assert!(log.contains("Recorded build step"), "log was: {log}");
}

#[test]
fn test_report_prefix_is_configurable() {
    let sandbox = Sandbox::new();

    sandbox
        .wrapper()
        .args(["--simulate", "--no-record"])
        .arg("--report-dir")
        .arg(sandbox.report_dir())
        .args(["--report-prefix", "xpy_json_output"])
        .arg("cc")
        .assert()
        .success();

    let reports = sandbox.reports();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].starts_with("xpy_json_output_"));
}

#[test]
fn test_steps_are_numbered_across_runs() {
    let sandbox = Sandbox::new();

    for _ in 0..3 {
        sandbox
            .wrapper()
            .args(["--simulate", "rustc", "-vV"])
            .assert()
            .success();
    }

    for label in ["001", "002", "003"] {
        assert!(
            sandbox.step_dir(label).join("flake.nix").is_file(),
            "step{label} should have been recorded"
        );
    }
    assert!(!sandbox.step_dir("004").exists());
}

#[test]
fn test_json_artifact_format() {
    let sandbox = Sandbox::new();

    sandbox
        .wrapper()
        .args(["--simulate", "--format", "json", "rustc", "--crate-name", "demo"])
        .assert()
        .success();

    let artifact = read_json(&sandbox.step_dir("001").join("step.json"));
    assert_eq!(artifact["step"], 1);
    assert_eq!(artifact["invocation"]["command"], "rustc");
    assert_eq!(
        artifact["invocation"]["arguments"],
        json!(["--crate-name", "demo"])
    );
    assert!(!sandbox.step_dir("001").join("flake.nix").exists());
}

#[test]
fn test_no_record_skips_the_step_root() {
    let sandbox = Sandbox::new();

    sandbox
        .wrapper()
        .args(["--simulate", "--no-record", "rustc"])
        .assert()
        .success();

    assert!(!sandbox.step_root().exists());
}

#[test]
fn test_reserved_field_is_rejected() {
    let sandbox = Sandbox::new();

    sandbox
        .wrapper()
        .arg("--simulate")
        .arg("--report-dir")
        .arg(sandbox.report_dir())
        .args(["--field", "command=other", "rustc"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("ConfigError"));
}

#[test]
fn test_malformed_config_is_an_error() {
    let sandbox = Sandbox::new();
    let config = sandbox.write("broken.toml", "[record]\nstep_width = \"wide\"\n");

    sandbox
        .wrapper()
        .arg("--config")
        .arg(&config)
        .args(["--simulate", "rustc"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("ConfigError"));

    assert!(!sandbox.step_root().exists());
}

#[test]
fn test_first_run_creates_example_config() {
    let sandbox = Sandbox::new();

    sandbox
        .wrapper()
        .args(["--simulate", "--no-record", "rustc"])
        .assert()
        .success();

    assert!(sandbox.data_dir().join("config.toml").is_file());
}

#[test]
fn test_missing_command_exits_127() {
    let sandbox = Sandbox::new();

    sandbox
        .wrapper()
        .arg("does-not-exist-stepwrap-test")
        .assert()
        .code(127)
        .stderr(predicate::str::contains("SpawnFailure"))
        .stderr(predicate::str::contains("does-not-exist-stepwrap-test"));

    // Recording happens before dispatch.
    assert!(sandbox.step_dir("001").join("flake.nix").is_file());
}

#[cfg(unix)]
#[test]
fn test_exit_code_propagates() {
    let sandbox = Sandbox::new();

    sandbox
        .wrapper()
        .args(["sh", "-c", "exit 7"])
        .assert()
        .code(7);

    assert!(sandbox.step_dir("001").join("flake.nix").is_file());
}

#[cfg(unix)]
#[test]
fn test_child_owns_stdio() {
    let sandbox = Sandbox::new();

    sandbox
        .wrapper()
        .args(["sh", "-c", "echo hello; echo oops >&2"])
        .assert()
        .success()
        .stdout("hello\n")
        .stderr(predicate::str::contains("oops"));
}

#[cfg(unix)]
#[test]
fn test_child_sees_captured_environment() {
    let sandbox = Sandbox::new();

    sandbox
        .wrapper()
        .args(["sh", "-c", "printf %s \"$STEPWRAP_TEST_VALUE\""])
        .env("STEPWRAP_TEST_VALUE", "from the caller")
        .assert()
        .success()
        .stdout("from the caller");
}

#[cfg(unix)]
#[test]
fn test_non_executable_command_exits_126() {
    let sandbox = Sandbox::new();
    let script = sandbox.write("build.sh", "#!/bin/sh\nexit 0\n");

    sandbox
        .wrapper()
        .arg(&script)
        .assert()
        .code(126)
        .stderr(predicate::str::contains("SpawnFailure"));
}
