use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use stepwrap::cli;
use stepwrap::dispatch::{ProcessSpawner, Spawner};
use stepwrap::invocation::PassthroughFields;
use stepwrap::recorder::read_artifact;
use stepwrap::report::{parse_manifest, render_report, run_batch, ReportNamer};
use stepwrap::{util, FailedInvocation};

/// Inspect, replay and batch-report stepwrap invocations
#[derive(Debug, Parser)]
#[command(name = "stepwrap-steps", version)]
struct StepsArgs {
    /// Data directory for config and logs [default: ~/.stepwrap]
    #[arg(long, value_name = "DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Config file [default: <data dir>/config.toml]
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: StepsCommand,
}

#[derive(Debug, Subcommand)]
enum StepsCommand {
    /// Write one dry-run report per manifest entry and print the file names
    DryRunBatch {
        /// Directory that receives the reports
        #[arg(long, value_name = "DIR")]
        output_dir: PathBuf,
        /// JSON array of {command, arguments, environment, cwd, fields}
        #[arg(long, value_name = "FILE")]
        manifest: PathBuf,
        /// Report file name prefix [default: from config]
        #[arg(long)]
        prefix: Option<String>,
        /// Also run each command after writing its report
        #[arg(long)]
        execute: bool,
    },
    /// Print the invocation recorded in a step artifact
    Show {
        artifact: PathBuf,
    },
    /// Run the invocation recorded in a step artifact again
    Replay {
        artifact: PathBuf,
        /// Print the dry-run report instead of running the command
        #[arg(long)]
        simulate: bool,
    },
}

fn main() -> ExitCode {
    let args = StepsArgs::parse();
    util::init_data_dir(args.data_dir.clone());
    util::init_file_logging();

    match run(args) {
        Ok(code) => cli::to_exit_code(code),
        Err(err) => cli::to_exit_code(cli::report_failure("stepwrap-steps", &err)),
    }
}

fn run(args: StepsArgs) -> Result<i32> {
    let config = cli::load_config(args.config.as_deref())?;
    let spawner = ProcessSpawner::new().allow_self_wrap(config.dispatch.allow_self_wrap);

    match args.command {
        StepsCommand::DryRunBatch {
            output_dir,
            manifest,
            prefix,
            execute,
        } => {
            let contents = fs::read_to_string(&manifest)
                .with_context(|| format!("failed to read manifest {}", manifest.display()))?;
            let entries = parse_manifest(&contents)
                .with_context(|| format!("invalid manifest {}", manifest.display()))?;
            let mut namer =
                ReportNamer::new(prefix.unwrap_or_else(|| config.report.prefix.clone()))?;
            let scrub = config.scrub_config()?;

            let items = run_batch(
                &entries,
                &output_dir,
                &mut namer,
                scrub.as_ref(),
                execute.then_some(&spawner as &dyn Spawner),
            )?;

            let names: Vec<&str> = items.iter().map(|item| item.filename.as_str()).collect();
            println!("{}", names.join(" "));

            Ok(items
                .iter()
                .filter_map(|item| item.exit)
                .find(|exit| !exit.success())
                .map_or(0, |exit| exit.exit_code()))
        }
        StepsCommand::Show { artifact } => {
            let descriptor = read_artifact(&artifact)?;
            println!("{}", serde_json::to_string_pretty(&descriptor)?);
            Ok(0)
        }
        StepsCommand::Replay { artifact, simulate } => {
            let descriptor = read_artifact(&artifact)?;
            if simulate {
                let report = render_report(&descriptor, &PassthroughFields::new(), None)?;
                io::stdout().write_all(&report)?;
                return Ok(0);
            }
            let exit = spawner
                .spawn(&descriptor)
                .map_err(|error| FailedInvocation::new(None, error))?;
            Ok(exit.exit_code())
        }
    }
}
