//! The companion binary: batch reports, artifact inspection, replay.

use super::common::sandbox::{list_files, read_json, Sandbox};
use predicates::prelude::*;
use serde_json::{json, Value};
use std::collections::HashSet;

const MANIFEST: &str = r#"[
    {"command": "rustc_0", "arguments": ["--version"],
     "environment": {"TEST_VAR": "test_value_0"}, "cwd": "/tmp/test_0"},
    {"command": "rustc_1", "arguments": ["--version"],
     "environment": {"TEST_VAR": "test_value_1"}, "cwd": "/tmp/test_1",
     "fields": {"dry_run_nix_json": true}},
    {"command": "rustc_2", "arguments": ["--version"],
     "environment": {"TEST_VAR": "test_value_2"}, "cwd": "/tmp/test_2"}
]"#;

#[test]
fn test_dry_run_batch_writes_one_report_per_entry() {
    let sandbox = Sandbox::new();
    let manifest = sandbox.write("manifest.json", MANIFEST);

    let output = sandbox
        .steps()
        .arg("dry-run-batch")
        .arg("--output-dir")
        .arg(sandbox.report_dir())
        .arg("--manifest")
        .arg(&manifest)
        .args(["--prefix", "xpy_json_output"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let stdout = String::from_utf8(output).unwrap();
    let names: Vec<&str> = stdout.split_whitespace().collect();
    assert_eq!(names.len(), 3, "Unexpected output: {stdout}");
    assert_eq!(names.iter().collect::<HashSet<_>>().len(), 3);
    assert_eq!(list_files(&sandbox.report_dir()).len(), 3);

    for (index, name) in names.iter().enumerate() {
        assert!(name.starts_with("xpy_json_output_"));
        assert!(name.ends_with(".json"));

        let report = read_json(&sandbox.report_dir().join(name));
        assert_eq!(report["command"], format!("rustc_{index}"));
        assert_eq!(report["arguments"], json!(["--version"]));
        assert_eq!(
            report["environment"]["TEST_VAR"],
            format!("test_value_{index}")
        );
        assert_eq!(report["cwd"], format!("/tmp/test_{index}"));
    }

    let second = read_json(&sandbox.report_dir().join(names[1]));
    assert_eq!(second["dry_run_nix_json"], true);
}

#[test]
fn test_dry_run_batch_rejects_bad_manifest() {
    let sandbox = Sandbox::new();
    let manifest = sandbox.write("manifest.json", r#"[{"arguments": []}]"#);

    sandbox
        .steps()
        .arg("dry-run-batch")
        .arg("--output-dir")
        .arg(sandbox.report_dir())
        .arg("--manifest")
        .arg(&manifest)
        .assert()
        .failure()
        .stdout("");
}

#[test]
fn test_show_prints_recorded_invocation() {
    let sandbox = Sandbox::new();
    sandbox
        .wrapper()
        .args(["--simulate", "rustc", "--edition=2021", "it's $HOME"])
        .env("TEST_VAR", "test_value_0")
        .assert()
        .success();

    let output = sandbox
        .steps()
        .arg("show")
        .arg(sandbox.step_dir("001").join("flake.nix"))
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let shown: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(shown["command"], "rustc");
    assert_eq!(shown["arguments"], json!(["--edition=2021", "it's $HOME"]));
    assert_eq!(shown["environment"]["TEST_VAR"], "test_value_0");
}

#[test]
fn test_show_missing_artifact_fails() {
    let sandbox = Sandbox::new();

    sandbox
        .steps()
        .arg("show")
        .arg(sandbox.root.join("nope/flake.nix"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("IOFailure"));
}

#[test]
fn test_replay_simulate_prints_report() {
    let sandbox = Sandbox::new();
    sandbox
        .wrapper()
        .args(["--simulate", "--format", "json", "rustc_9", "--version"])
        .assert()
        .success();

    let output = sandbox
        .steps()
        .arg("replay")
        .arg(sandbox.step_dir("001").join("step.json"))
        .arg("--simulate")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["command"], "rustc_9");
    assert_eq!(report["arguments"], json!(["--version"]));
}

#[cfg(unix)]
#[test]
fn test_replay_runs_recorded_command() {
    let sandbox = Sandbox::new();
    sandbox
        .wrapper()
        .args(["--simulate", "sh", "-c", "exit 3"])
        .assert()
        .success();

    sandbox
        .steps()
        .arg("replay")
        .arg(sandbox.step_dir("001").join("flake.nix"))
        .assert()
        .code(3);
}
