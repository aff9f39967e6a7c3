//! Where stepwrap keeps its own files.
//!
//! Everything lives under one data directory: `~/.stepwrap` unless
//! `--data-dir` points elsewhere.

use std::path::PathBuf;
use std::sync::OnceLock;

static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Pin the data directory for this process. Call once from `main` before
/// loading config or opening the log; later calls keep the first value.
pub fn init_data_dir(custom_path: Option<PathBuf>) {
    let path = custom_path.unwrap_or_else(default_data_dir);
    if let Err(rejected) = DATA_DIR.set(path) {
        tracing::debug!(
            path = %rejected.display(),
            "Data directory already pinned; keeping the first one"
        );
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".stepwrap"))
        .unwrap_or_else(|| PathBuf::from(".stepwrap"))
}

pub fn data_dir() -> PathBuf {
    DATA_DIR.get().cloned().unwrap_or_else(default_data_dir)
}

pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

/// Append-only wrapper log; stdout and stderr stay with the wrapped tool.
pub fn log_file_path() -> PathBuf {
    logs_dir().join("stepwrap.log")
}

/// Step root used when neither config nor `--step-root` names one.
pub fn steps_dir() -> PathBuf {
    data_dir().join("steps")
}

/// Dry-run reports land here in simulate mode when no report directory is
/// configured.
pub fn reports_dir() -> PathBuf {
    data_dir().join("reports")
}

pub fn config_path() -> PathBuf {
    data_dir().join("config.toml")
}
