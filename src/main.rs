use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use stepwrap::cli::{self, WrapperArgs};
use stepwrap::{util, EnvSnapshot, Interceptor, InvocationDescriptor};

fn main() -> ExitCode {
    // Snapshot first: nothing after this point may change what gets recorded.
    let environment = EnvSnapshot::capture();
    let cwd = std::env::current_dir().ok();

    let args = WrapperArgs::parse();
    util::init_data_dir(args.data_dir.clone());
    util::init_file_logging();

    match run(&args, environment, cwd) {
        Ok(code) => cli::to_exit_code(code),
        Err(err) => cli::to_exit_code(cli::report_failure("stepwrap", &err)),
    }
}

fn run(args: &WrapperArgs, environment: EnvSnapshot, cwd: Option<PathBuf>) -> Result<i32> {
    let mut config = cli::load_config(args.config.as_deref())?;
    args.apply_to(&mut config);

    let descriptor =
        InvocationDescriptor::from_argv(args.command.iter().cloned(), environment)?
            .with_cwd_opt(cwd);
    let mut interceptor = Interceptor::from_config(&config, args.passthrough_fields())?;
    let outcome = interceptor.run(&descriptor)?;
    Ok(outcome.exit_code())
}
