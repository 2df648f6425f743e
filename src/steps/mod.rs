//! Step variants.
//!
//! A [`Step`] is one unit of a sequence:
//!
//! - [`CommandStep`] - runs a host command synchronously
//! - [`ProcessStep`] - spawns a process and completes from its callbacks
//!
//! Steps never advance the sequence themselves. `run` returns a
//! [`StepOutcome`] and the controller decides what happens next.

pub mod command;
pub mod process;

pub use command::CommandStep;
pub use process::ProcessStep;

use crate::config::{CommandParams, ProcessParams, StepKind, StepSpec};
use crate::error::Result;
use crate::host::{ExitStatus, Host, ProcessListener};
use std::sync::Arc;

/// What a step's `run` left behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Done; the sequence can advance right away.
    Complete,
    /// Waiting for process callbacks.
    Pending,
}

/// Services a step runs against.
pub struct StepContext {
    /// The host.
    pub host: Arc<dyn Host>,
    /// Where a spawned process reports to.
    pub listener: Arc<dyn ProcessListener>,
}

/// One dispatched step.
pub enum Step {
    Command(CommandStep),
    Process(ProcessStep),
}

impl Step {
    /// Construct an idle step of the given kind.
    pub fn new(kind: StepKind) -> Self {
        match kind {
            StepKind::Command => Step::Command(CommandStep::new()),
            StepKind::Process => Step::Process(ProcessStep::new()),
        }
    }

    /// Validate a spec without running it.
    ///
    /// Performs the same checks dispatch would, short of touching a host.
    pub fn check(spec: &StepSpec) -> Result<StepKind> {
        let kind = spec.step_kind()?;
        match kind {
            StepKind::Command => {
                spec.parse_params::<CommandParams>()?;
            }
            StepKind::Process => {
                let params: ProcessParams = spec.parse_params()?;
                if let Some(sink) = &params.sink {
                    crate::sink::check_sink(sink)?;
                }
            }
        }
        Ok(kind)
    }

    /// Which variant this is.
    pub fn kind(&self) -> StepKind {
        match self {
            Step::Command(_) => StepKind::Command,
            Step::Process(_) => StepKind::Process,
        }
    }

    /// Start the step with the spec's parameters.
    pub fn run(&mut self, spec: &StepSpec, ctx: &StepContext) -> Result<StepOutcome> {
        match self {
            Step::Command(step) => step.run(spec, ctx),
            Step::Process(step) => step.run(spec, ctx),
        }
    }

    /// Handle an output chunk.
    pub fn on_data(&mut self, chunk: &[u8]) {
        if let Step::Process(step) = self {
            step.on_data(chunk);
        }
    }

    /// Handle completion; an error means the sequence must stop.
    pub fn on_finished(&mut self, status: ExitStatus) -> Result<()> {
        match self {
            Step::Command(_) => Ok(()),
            Step::Process(step) => step.on_finished(status),
        }
    }

    /// Cooperative cancellation.
    pub fn stop(&mut self) {
        if let Step::Process(step) = self {
            step.stop();
        }
    }
}
