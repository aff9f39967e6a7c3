use std::fs::{self, OpenOptions};

use tracing_subscriber::EnvFilter;

use crate::util::paths::{log_file_path, logs_dir};

const DEFAULT_FILTER: &str = "warn";

/// Route `tracing` output to `<data_dir>/logs/stepwrap.log`.
///
/// Stdout and stderr belong to the wrapped tool, so nothing is logged to the
/// terminal. Returns false (and logs nothing) if the file cannot be opened;
/// a broken log directory must not fail a compile.
pub fn init_file_logging() -> bool {
    if fs::create_dir_all(logs_dir()).is_err() {
        return false;
    }

    let Ok(log_file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path())
    else {
        return false;
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter_from(std::env::var(EnvFilter::DEFAULT_ENV).ok()))
        .with_writer(log_file)
        .with_ansi(false)
        .try_init()
        .is_ok()
}

/// `RUST_LOG` directives when set and valid, `warn` otherwise.
fn filter_from(directives: Option<String>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}
