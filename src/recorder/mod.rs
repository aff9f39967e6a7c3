//! Step recording: numbered, self-contained artifacts for each intercepted
//! invocation.

pub mod artifact;
pub mod step;

pub use artifact::{
    parse_artifact, read_artifact, render_artifact, ArtifactFormat, ArtifactOptions,
};
pub use step::{BuildStep, RecorderOptions, StepRecorder, DEFAULT_STEP_WIDTH};
