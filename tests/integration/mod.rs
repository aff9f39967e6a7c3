//! End-to-end tests that drive the compiled binaries.

#[path = "../common/mod.rs"]
pub mod common;

pub mod steps_cli;
pub mod wrapper_cli;
