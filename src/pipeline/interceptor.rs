use std::path::PathBuf;

use crate::config::Config;
use crate::dispatch::{ExitOutcome, ProcessSpawner, Spawner};
use crate::error::{FailedInvocation, InvocationError};
use crate::invocation::{InvocationDescriptor, PassthroughFields};
use crate::recorder::{BuildStep, StepRecorder};
use crate::report::{DryRunEmitter, ReportNamer};

/// Lifecycle of a single invocation.
///
/// `Captured → Recorded → {Executed | Simulated}`. `Recorded` is skipped only
/// when recording is disabled; the two terminal states exclude each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationState {
    Captured,
    Recorded,
    Executed,
    Simulated,
}

impl InvocationState {
    fn can_advance_to(self, next: InvocationState) -> bool {
        use InvocationState::*;
        matches!(
            (self, next),
            (Captured, Recorded)
                | (Captured, Executed)
                | (Captured, Simulated)
                | (Recorded, Executed)
                | (Recorded, Simulated)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, InvocationState::Executed | InvocationState::Simulated)
    }
}

/// Where dry-run reports go and how they are named.
#[derive(Debug, Clone)]
pub struct ReportTarget {
    pub dir: PathBuf,
    pub namer: ReportNamer,
    pub emitter: DryRunEmitter,
}

#[derive(Debug, Clone)]
pub struct InvocationOutcome {
    /// Every state the invocation passed through, in order
    pub states: Vec<InvocationState>,
    pub step: Option<BuildStep>,
    pub report_path: Option<PathBuf>,
    /// `None` when simulated
    pub exit: Option<ExitOutcome>,
}

impl InvocationOutcome {
    pub fn final_state(&self) -> InvocationState {
        self.states
            .last()
            .copied()
            .unwrap_or(InvocationState::Captured)
    }

    /// Exit code for the wrapper: the child's, or 0 when simulated.
    pub fn exit_code(&self) -> i32 {
        self.exit.map_or(0, |exit| exit.exit_code())
    }
}

pub struct Interceptor<S: Spawner> {
    recorder: Option<StepRecorder>,
    report: Option<ReportTarget>,
    simulate: bool,
    spawner: S,
}

impl Interceptor<ProcessSpawner> {
    /// Wire up recorder, report target and spawner from configuration.
    pub fn from_config(
        config: &Config,
        fields: PassthroughFields,
    ) -> Result<Self, InvocationError> {
        let recorder = config.build_recorder()?;
        let scrub = config.scrub_config()?;

        let report = match config.report_dir() {
            Some(dir) => Some(ReportTarget {
                dir,
                namer: ReportNamer::new(config.report.prefix.clone())?,
                emitter: DryRunEmitter::new()
                    .with_fields(fields)
                    .with_scrub(scrub),
            }),
            None if !fields.is_empty() => {
                tracing::warn!("Passthrough fields given without a report directory; ignoring them");
                None
            }
            None => None,
        };

        let spawner = ProcessSpawner::new().allow_self_wrap(config.dispatch.allow_self_wrap);
        Ok(Self::new(spawner)
            .with_recorder(recorder)
            .with_report(report)
            .simulate(config.report.simulate))
    }
}

impl<S: Spawner> Interceptor<S> {
    pub fn new(spawner: S) -> Self {
        Self {
            recorder: None,
            report: None,
            simulate: false,
            spawner,
        }
    }

    pub fn with_recorder(mut self, recorder: Option<StepRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    pub fn with_report(mut self, report: Option<ReportTarget>) -> Self {
        self.report = report;
        self
    }

    /// In simulate mode the real command is never spawned.
    pub fn simulate(mut self, simulate: bool) -> Self {
        self.simulate = simulate;
        self
    }

    pub fn recorder(&self) -> Option<&StepRecorder> {
        self.recorder.as_ref()
    }

    pub fn spawner(&self) -> &S {
        &self.spawner
    }

    pub fn run(
        &mut self,
        descriptor: &InvocationDescriptor,
    ) -> Result<InvocationOutcome, FailedInvocation> {
        let mut outcome = InvocationOutcome {
            states: vec![InvocationState::Captured],
            step: None,
            report_path: None,
            exit: None,
        };
        tracing::debug!(
            command = %descriptor.command(),
            args = descriptor.arguments().len(),
            fingerprint = %descriptor.fingerprint(),
            "Captured invocation"
        );

        if let Some(recorder) = self.recorder.as_mut() {
            let step = recorder
                .record(descriptor)
                .map_err(|error| FailedInvocation::new(Some(recorder.issued()), error))?;
            outcome.step = Some(step);
            advance(&mut outcome, InvocationState::Recorded);
        }
        let step_number = outcome.step.as_ref().map(|s| s.sequence_number);

        if let Some(report) = self.report.as_mut() {
            let filename = report.namer.next_name();
            let path = report
                .emitter
                .emit(descriptor, &report.dir, &filename)
                .map_err(|error| FailedInvocation::new(step_number, error))?;
            outcome.report_path = Some(path);
        }

        if self.simulate {
            tracing::info!(
                step = ?step_number,
                command = %descriptor.command(),
                "Simulated invocation"
            );
            advance(&mut outcome, InvocationState::Simulated);
            return Ok(outcome);
        }

        let exit = self
            .spawner
            .spawn(descriptor)
            .map_err(|error| FailedInvocation::new(step_number, error))?;
        if !exit.success() {
            tracing::info!(
                step = ?step_number,
                command = %descriptor.command(),
                outcome = %exit,
                "Wrapped command failed"
            );
        }
        outcome.exit = Some(exit);
        advance(&mut outcome, InvocationState::Executed);
        Ok(outcome)
    }
}

fn advance(outcome: &mut InvocationOutcome, next: InvocationState) {
    let current = outcome.final_state();
    debug_assert!(
        current.can_advance_to(next),
        "illegal transition {current:?} -> {next:?}"
    );
    outcome.states.push(next);
}
