//! Utility modules

pub mod fs;
pub mod logging;
pub mod paths;
pub mod scrub;

pub use fs::write_atomic;
pub use logging::init_file_logging;
pub use paths::{
    config_path, data_dir, init_data_dir, log_file_path, logs_dir, reports_dir, steps_dir,
};
pub use scrub::ScrubConfig;
