//! Sequence state machine.

use crate::config::StepSpec;
use crate::error::Result;
use crate::host::{ExitStatus, Host, ProcessListener};
use crate::steps::{Step, StepContext, StepOutcome};
use std::sync::Arc;
use tracing::debug;

/// Result of one [`Sequence::run_next`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// The step at the cursor completed synchronously.
    Completed,
    /// The step at the cursor is waiting for process callbacks.
    Waiting,
    /// The cursor moved past the last step.
    Finished,
}

/// An ordered list of steps and the position reached in it.
///
/// The cursor starts at -1 and only moves forward, one step per
/// [`run_next`](Self::run_next). At most one step is in flight.
pub struct Sequence {
    id: u64,
    specs: Vec<StepSpec>,
    cursor: isize,
    current: Option<Step>,
}

impl Sequence {
    pub fn new(id: u64, specs: Vec<StepSpec>) -> Self {
        Self {
            id,
            specs,
            cursor: -1,
            current: None,
        }
    }

    /// Identifies this sequence among all sequences of one controller.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Index of the step last dispatched, -1 before the first.
    pub fn cursor(&self) -> isize {
        self.cursor
    }

    /// The step in flight, if any.
    pub fn current(&self) -> Option<&Step> {
        self.current.as_ref()
    }

    /// Move the cursor forward and dispatch the step there.
    ///
    /// `listener` builds the callback target for a process step at a
    /// given index.
    pub fn run_next(
        &mut self,
        host: &Arc<dyn Host>,
        listener: impl FnOnce(usize) -> Arc<dyn ProcessListener>,
    ) -> Result<Advance> {
        self.cursor += 1;
        let index = self.cursor as usize;
        debug!("Sequence {} advancing to step {}", self.id, index);

        let Some(spec) = self.specs.get(index).cloned() else {
            self.current = None;
            return Ok(Advance::Finished);
        };

        let ctx = StepContext {
            host: Arc::clone(host),
            listener: listener(index),
        };
        self.dispatch(&spec, &ctx)
    }

    fn dispatch(&mut self, spec: &StepSpec, ctx: &StepContext) -> Result<Advance> {
        let kind = spec.step_kind()?;
        let step = self.current.insert(Step::new(kind));
        debug!("Dispatching {} step {}", kind, self.cursor);

        match step.run(spec, ctx) {
            Ok(StepOutcome::Pending) => Ok(Advance::Waiting),
            Ok(StepOutcome::Complete) => {
                self.current = None;
                Ok(Advance::Completed)
            }
            Err(e) => {
                self.current = None;
                Err(e)
            }
        }
    }

    /// Whether `index` is the step currently in flight.
    pub fn owns(&self, index: usize) -> bool {
        self.current.is_some() && self.cursor == index as isize
    }

    /// Route an output chunk to the step at `index`.
    ///
    /// Returns false if that step is no longer in flight.
    pub fn deliver_data(&mut self, index: usize, chunk: &[u8]) -> bool {
        if !self.owns(index) {
            return false;
        }
        if let Some(step) = self.current.as_mut() {
            step.on_data(chunk);
        }
        true
    }

    /// Route completion to the step at `index`, retiring it.
    ///
    /// Returns `None` if that step is no longer in flight.
    pub fn deliver_finished(&mut self, index: usize, status: ExitStatus) -> Option<Result<()>> {
        if !self.owns(index) {
            return None;
        }
        let mut step = self.current.take()?;
        Some(step.on_finished(status))
    }

    /// Stop the step in flight.
    pub fn abort(&mut self) {
        if let Some(mut step) = self.current.take() {
            debug!("Stopping step {} of sequence {}", self.cursor, self.id);
            step.stop();
        }
    }
}
