//! Shared test utilities
//!
//! - Sandboxed data, step and report directories
//! - Command builders for both binaries

pub mod sandbox;
