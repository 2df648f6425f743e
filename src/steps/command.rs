//! Host command step.

use super::{StepContext, StepOutcome};
use crate::config::{CommandParams, StepSpec};
use crate::error::Result;
use tracing::debug;

/// Runs a host command synchronously.
///
/// The host API gives no result for a command, so a failing command is
/// indistinguishable from a successful one: this step always completes.
#[derive(Debug, Default)]
pub struct CommandStep;

impl CommandStep {
    pub fn new() -> Self {
        Self
    }

    /// Run the command named in `spec`.
    pub fn run(&mut self, spec: &StepSpec, ctx: &StepContext) -> Result<StepOutcome> {
        let params: CommandParams = spec.parse_params()?;
        debug!("Running host command '{}'", params.command);
        ctx.host.run_command(&params.command, params.args.as_ref());
        Ok(StepOutcome::Complete)
    }
}
