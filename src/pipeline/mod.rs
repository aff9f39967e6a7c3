//! Drives one intercepted invocation from capture to its terminal state.

pub mod interceptor;

pub use interceptor::{Interceptor, InvocationOutcome, InvocationState, ReportTarget};
