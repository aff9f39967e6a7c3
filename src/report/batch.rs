//! Batch dry-run driver: one report per manifest entry.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::dispatch::{ExitOutcome, Spawner};
use crate::error::{FailedInvocation, InvocationError};
use crate::invocation::{EnvSnapshot, InvocationDescriptor, PassthroughFields};
use crate::report::emitter::DryRunEmitter;
use crate::report::naming::ReportNamer;
use crate::util::scrub::ScrubConfig;

/// One invocation described in a batch manifest (a JSON array of these).
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestEntry {
    pub command: String,
    #[serde(default)]
    pub arguments: Vec<String>,
    #[serde(default)]
    pub environment: EnvSnapshot,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    #[serde(default)]
    pub fields: PassthroughFields,
}

impl ManifestEntry {
    pub fn to_descriptor(&self) -> Result<InvocationDescriptor, InvocationError> {
        Ok(InvocationDescriptor::new(
            self.command.clone(),
            self.arguments.clone(),
            self.environment.clone(),
        )?
        .with_cwd_opt(self.cwd.clone()))
    }
}

pub fn parse_manifest(contents: &str) -> Result<Vec<ManifestEntry>, InvocationError> {
    Ok(serde_json::from_str(contents)?)
}

#[derive(Debug, Clone)]
pub struct BatchItem {
    pub filename: String,
    pub path: PathBuf,
    /// Set when the batch also executed the command
    pub exit: Option<ExitOutcome>,
}

/// Emit a report for every entry, in order. With a spawner, each command is
/// executed after its report is written. The first failure stops the batch
/// and names the 1-based entry it happened on.
pub fn run_batch(
    entries: &[ManifestEntry],
    output_directory: &Path,
    namer: &mut ReportNamer,
    scrub: Option<&ScrubConfig>,
    spawner: Option<&dyn Spawner>,
) -> Result<Vec<BatchItem>, FailedInvocation> {
    let mut items = Vec::with_capacity(entries.len());

    for (entry, position) in entries.iter().zip(1u64..) {
        let fail = |error| FailedInvocation::new(Some(position), error);

        let descriptor = entry.to_descriptor().map_err(fail)?;
        let filename = namer.next_name();
        let emitter = DryRunEmitter::new()
            .with_fields(entry.fields.clone())
            .with_scrub(scrub.cloned());
        let path = emitter
            .emit(&descriptor, output_directory, &filename)
            .map_err(fail)?;

        let exit = match spawner {
            Some(spawner) => Some(spawner.spawn(&descriptor).map_err(fail)?),
            None => None,
        };

        items.push(BatchItem {
            filename,
            path,
            exit,
        });
    }

    Ok(items)
}
