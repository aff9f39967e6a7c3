//! Dry-run reports: JSON documents describing what an invocation would run.

pub mod batch;
pub mod emitter;
pub mod naming;

pub use batch::{parse_manifest, run_batch, BatchItem, ManifestEntry};
pub use emitter::{render_report, DryRunEmitter, RESERVED_KEYS};
pub use naming::{ReportNamer, DEFAULT_REPORT_PREFIX};
