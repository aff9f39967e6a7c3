//! Dispatch of the real command behind an intercepted invocation.
//!
//! If the wrapped command is another stepwrap, `ProcessSpawner` refuses to
//! run it (unless explicitly allowed) instead of recursing.

pub mod exit;
pub mod spawner;

pub use exit::ExitOutcome;
pub use spawner::{ProcessSpawner, Spawner};
