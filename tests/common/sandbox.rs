//! Temporary directories standing in for a real build tree.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// A throwaway data directory with a step root and a report directory.
///
/// Everything is removed when the sandbox is dropped.
pub struct Sandbox {
    _dir: TempDir,
    pub root: PathBuf,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let root = dir.path().to_path_buf();
        Self { _dir: dir, root }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    pub fn step_root(&self) -> PathBuf {
        self.root.join("steps")
    }

    pub fn report_dir(&self) -> PathBuf {
        self.root.join("reports")
    }

    /// `stepwrap` pointed at this sandbox. Append options, then the command.
    pub fn wrapper(&self) -> Command {
        let mut cmd = Command::cargo_bin("stepwrap").expect("stepwrap binary");
        cmd.arg("--data-dir")
            .arg(self.data_dir())
            .arg("--step-root")
            .arg(self.step_root());
        cmd
    }

    /// `stepwrap-steps` pointed at this sandbox.
    pub fn steps(&self) -> Command {
        let mut cmd = Command::cargo_bin("stepwrap-steps").expect("stepwrap-steps binary");
        cmd.arg("--data-dir").arg(self.data_dir());
        cmd
    }

    pub fn step_dir(&self, label: &str) -> PathBuf {
        self.step_root().join(format!("step{label}"))
    }

    /// File names in the report directory, sorted.
    pub fn reports(&self) -> Vec<String> {
        list_files(&self.report_dir())
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.root.join(name);
        fs::write(&path, contents).expect("Failed to write fixture");
        path
    }
}

pub fn list_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}

pub fn read_json(path: &Path) -> Value {
    let contents = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {e}", path.display()));
    serde_json::from_str(&contents)
        .unwrap_or_else(|e| panic!("{} is not JSON: {e}", path.display()))
}
