//! Command-line surface shared by the `stepwrap` binaries.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use crate::config::Config;
use crate::error::{FailedInvocation, InvocationError};
use crate::invocation::{parse_assignment, FieldValue, PassthroughFields};
use crate::recorder::ArtifactFormat;

/// Record a toolchain invocation as a build step, then run it (or simulate it).
///
/// Options must come before the wrapped command; everything from the command
/// on is passed through verbatim.
#[derive(Debug, Parser)]
#[command(name = "stepwrap", version)]
pub struct WrapperArgs {
    /// Data directory for config, logs and the default step root [default: ~/.stepwrap]
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Config file [default: <data dir>/config.toml]
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory that receives step001/, step002/, ...
    #[arg(long, value_name = "DIR")]
    pub step_root: Option<PathBuf>,

    /// Do not write a build step artifact
    #[arg(long)]
    pub no_record: bool,

    /// Artifact format
    #[arg(long, value_enum, value_name = "FORMAT")]
    pub format: Option<ArtifactFormat>,

    /// Write records and reports only; never run the real command
    #[arg(long)]
    pub simulate: bool,

    /// Write a JSON dry-run report into this directory
    #[arg(long, value_name = "DIR")]
    pub report_dir: Option<PathBuf>,

    /// File name prefix for dry-run reports
    #[arg(long, value_name = "PREFIX")]
    pub report_prefix: Option<String>,

    /// Extra primitive field added to the dry-run report (repeatable)
    #[arg(long = "field", value_name = "KEY=VALUE", value_parser = parse_field)]
    pub fields: Vec<(String, FieldValue)>,

    /// The real command followed by its arguments
    #[arg(
        value_name = "COMMAND",
        required = true,
        num_args = 1..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}

fn parse_field(raw: &str) -> Result<(String, FieldValue), String> {
    parse_assignment(raw).map_err(|e| e.to_string())
}

impl WrapperArgs {
    /// Command-line flags win over the config file.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(root) = &self.step_root {
            config.record.root = root.clone();
        }
        if self.no_record {
            config.record.enabled = false;
        }
        if let Some(format) = self.format {
            config.record.format = format;
        }
        if self.simulate {
            config.report.simulate = true;
        }
        if let Some(dir) = &self.report_dir {
            config.report.dir = Some(dir.clone());
        }
        if let Some(prefix) = &self.report_prefix {
            config.report.prefix = prefix.clone();
        }
    }

    pub fn passthrough_fields(&self) -> PassthroughFields {
        self.fields.iter().cloned().collect()
    }
}

/// Load the explicitly named config file, or the default one.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, InvocationError> {
    match explicit {
        Some(path) if !path.exists() => Err(InvocationError::Config(format!(
            "config file {} does not exist",
            path.display()
        ))),
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

/// Print a top-level failure to stderr and pick the exit code for it.
pub fn report_failure(program: &str, err: &anyhow::Error) -> i32 {
    let (message, code) = match err.downcast_ref::<FailedInvocation>() {
        Some(failed) => (failed.to_string(), failed.exit_code()),
        None => match err.downcast_ref::<InvocationError>() {
            Some(error) => (format!("{}: {error}", error.kind()), error.exit_code()),
            None => (format!("{err:#}"), 1),
        },
    };
    tracing::error!(error = %message, code, "Invocation failed");
    eprintln!("{program}: {message}");
    code
}

pub fn to_exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
