//! Compiler-invocation interception and provenance recording.
//!
//! A wrapper placed in front of a real toolchain command captures each
//! invocation (command, arguments, environment), records it as a numbered,
//! replayable build step, optionally writes a JSON dry-run report, and then
//! runs the real command or simulates it.

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod invocation;
pub mod pipeline;
pub mod recorder;
pub mod report;
pub mod util;

pub use config::Config;
pub use dispatch::{ExitOutcome, ProcessSpawner, Spawner};
pub use error::{ErrorKind, FailedInvocation, InvocationError};
pub use invocation::{EnvSnapshot, FieldValue, InvocationDescriptor, PassthroughFields};
pub use pipeline::{Interceptor, InvocationOutcome, InvocationState};
pub use recorder::{read_artifact, ArtifactFormat, BuildStep, StepRecorder};
pub use report::{DryRunEmitter, ReportNamer};
