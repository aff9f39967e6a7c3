use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::InvocationError;
use crate::invocation::InvocationDescriptor;
use crate::recorder::artifact::{render_artifact, ArtifactOptions};
use crate::util::fs::write_atomic;

pub const DEFAULT_STEP_WIDTH: usize = 3;
const STEP_DIR_PREFIX: &str = "step";

/// A recorded invocation: its number, what it captured, and where the
/// artifact landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStep {
    pub sequence_number: u64,
    pub descriptor: InvocationDescriptor,
    pub artifact_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct RecorderOptions {
    pub root: PathBuf,
    /// Zero-padding width of the step directory number
    pub step_width: usize,
    pub artifact: ArtifactOptions,
}

impl RecorderOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            step_width: DEFAULT_STEP_WIDTH,
            artifact: ArtifactOptions::default(),
        }
    }
}

/// Assigns step numbers and writes one artifact per step under
/// `<root>/step<NNN>/`.
///
/// Numbering is per recorder instance: it starts at 1, goes up by one per
/// `record` call and is never reused, even when the write fails. There is no
/// cross-process locking; two processes sharing a root must be serialized by
/// the caller.
#[derive(Debug)]
pub struct StepRecorder {
    options: RecorderOptions,
    issued: u64,
}

impl StepRecorder {
    pub fn new(options: RecorderOptions) -> Self {
        Self { options, issued: 0 }
    }

    /// Continue numbering after the highest `step<N>` directory already
    /// present under the root.
    pub fn resume(options: RecorderOptions) -> Result<Self, InvocationError> {
        let issued = highest_existing_step(&options.root)?;
        if issued > 0 {
            tracing::debug!(
                root = %options.root.display(),
                last_step = issued,
                "Resuming step numbering"
            );
        }
        Ok(Self { options, issued })
    }

    pub fn root(&self) -> &Path {
        &self.options.root
    }

    /// The last sequence number handed out (0 before the first call).
    pub fn issued(&self) -> u64 {
        self.issued
    }

    pub fn step_label(&self, sequence_number: u64) -> String {
        format!(
            "{:0width$}",
            sequence_number,
            width = self.options.step_width
        )
    }

    pub fn step_dir(&self, sequence_number: u64) -> PathBuf {
        self.options.root.join(format!(
            "{STEP_DIR_PREFIX}{}",
            self.step_label(sequence_number)
        ))
    }

    pub fn record(
        &mut self,
        descriptor: &InvocationDescriptor,
    ) -> Result<BuildStep, InvocationError> {
        self.issued += 1;
        let sequence_number = self.issued;
        let label = self.step_label(sequence_number);

        let contents =
            render_artifact(&label, sequence_number, descriptor, &self.options.artifact)?;

        fs::create_dir_all(&self.options.root)
            .map_err(|e| InvocationError::io(&self.options.root, e))?;
        let step_dir = self.step_dir(sequence_number);
        fs::create_dir(&step_dir).map_err(|e| {
            if e.kind() == io::ErrorKind::AlreadyExists {
                InvocationError::io(
                    &step_dir,
                    io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        "step directory already exists; steps are written once",
                    ),
                )
            } else {
                InvocationError::io(&step_dir, e)
            }
        })?;

        let artifact_path = step_dir.join(self.options.artifact.format.file_name());
        if let Err(err) = write_atomic(&artifact_path, contents.as_bytes()) {
            if let Err(cleanup) = fs::remove_dir(&step_dir) {
                tracing::warn!(
                    path = %step_dir.display(),
                    error = %cleanup,
                    "Failed to remove empty step directory"
                );
            }
            return Err(err);
        }

        tracing::info!(
            step = sequence_number,
            command = %descriptor.command(),
            path = %artifact_path.display(),
            "Recorded build step"
        );

        Ok(BuildStep {
            sequence_number,
            descriptor: descriptor.clone(),
            artifact_path,
        })
    }
}

fn highest_existing_step(root: &Path) -> Result<u64, InvocationError> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(InvocationError::io(root, e)),
    };

    let mut highest = 0;
    for entry in entries {
        let entry = entry.map_err(|e| InvocationError::io(root, e))?;
        let name = entry.file_name();
        let Some(number) = name
            .to_str()
            .and_then(|n| n.strip_prefix(STEP_DIR_PREFIX))
            .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|digits| digits.parse::<u64>().ok())
        else {
            continue;
        };
        highest = highest.max(number);
    }
    Ok(highest)
}
