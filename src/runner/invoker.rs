//! The sequencing controller.

use super::sequence::{Advance, Sequence};
use super::slot::{RunSlot, RunStatus, SlotState};
use crate::config::RunRequest;
use crate::error::InvokerError;
use crate::host::{ExitStatus, Host, ProcessListener};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, error, info};

/// Context key answered by [`Invoker::query_context`].
pub const RUNNING_CONTEXT_KEY: &str = "invoker_running";

/// Comparison requested by a context query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextOperator {
    Equal,
    NotEqual,
    RegexMatch,
    NotRegexMatch,
    RegexContains,
    NotRegexContains,
}

struct Shared {
    host: Arc<dyn Host>,
    slot: RunSlot,
    next_id: AtomicU64,
}

/// Runs one sequence of steps at a time against a host.
///
/// Clones share one slot, so any clone can abort a sequence started
/// through another.
///
/// # Example
///
/// ```
/// use invoker::config::StepSpec;
/// use invoker::host::MockHost;
/// use invoker::runner::{Invoker, RunStatus};
/// use std::sync::Arc;
///
/// let host = Arc::new(MockHost::new());
/// let invoker = Invoker::new(host.clone());
///
/// invoker.start(vec![StepSpec::command("save", None)]);
/// assert_eq!(invoker.last_outcome(), Some(RunStatus::Finished));
/// assert_eq!(host.statuses(), vec!["Started", "Finished"]);
/// ```
#[derive(Clone)]
pub struct Invoker {
    shared: Arc<Shared>,
}

impl Invoker {
    pub fn new(host: Arc<dyn Host>) -> Self {
        Self {
            shared: Arc::new(Shared {
                host,
                slot: RunSlot::new(),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// The host steps run against.
    pub fn host(&self) -> &Arc<dyn Host> {
        &self.shared.host
    }

    /// Start a sequence unless one is already running.
    ///
    /// Synchronous steps run before this returns; the first process step
    /// hands control to its callbacks.
    pub fn start(&self, request: impl Into<RunRequest>) -> RunStatus {
        let shared = &self.shared;
        let mut state = shared.slot.lock();
        if state.active.is_some() {
            shared.post(RunStatus::AlreadyRunning);
            return RunStatus::AlreadyRunning;
        }

        let id = shared.next_id.fetch_add(1, Ordering::SeqCst);
        let steps = request.into().into_steps();
        info!("Starting sequence {} with {} step(s)", id, steps.len());

        state.active = Some(Sequence::new(id, steps));
        state.last_outcome = None;
        shared.post(RunStatus::Started);
        shared.drive(&mut state);
        RunStatus::Started
    }

    /// Stop the running sequence.
    pub fn abort(&self) -> RunStatus {
        let shared = &self.shared;
        let mut state = shared.slot.lock();
        match state.active.as_mut() {
            Some(sequence) => {
                info!("Aborting sequence {}", sequence.id());
                sequence.abort();
                shared.release(&mut state, RunStatus::Aborted);
                RunStatus::Aborted
            }
            None => {
                shared.post(RunStatus::NothingToStop);
                RunStatus::NothingToStop
            }
        }
    }

    /// Whether a sequence occupies the slot.
    pub fn is_running(&self) -> bool {
        self.shared.slot.lock().active.is_some()
    }

    /// Cursor of the running sequence.
    pub fn cursor(&self) -> Option<isize> {
        self.shared.slot.lock().active.as_ref().map(Sequence::cursor)
    }

    /// How the most recent sequence ended, `None` while one is running.
    pub fn last_outcome(&self) -> Option<RunStatus> {
        self.shared.slot.lock().last_outcome
    }

    /// Answer a host context query.
    ///
    /// Only [`RUNNING_CONTEXT_KEY`] is known; other keys give `None`.
    pub fn query_context(
        &self,
        key: &str,
        operator: ContextOperator,
        operand: bool,
    ) -> Option<bool> {
        if key != RUNNING_CONTEXT_KEY {
            return None;
        }

        let running = self.is_running();
        match operator {
            ContextOperator::Equal => Some(running == operand),
            ContextOperator::NotEqual => Some(running != operand),
            _ => {
                self.shared.host.status_message(&format!(
                    "\"{}\" context supports only \"equal\" and \"not_equal\" operators!",
                    RUNNING_CONTEXT_KEY
                ));
                Some(false)
            }
        }
    }

    /// Block until no sequence is running.
    pub fn wait_idle(&self) -> Option<RunStatus> {
        self.shared.slot.wait_idle()
    }

    /// Block until no sequence is running or `timeout` passes.
    ///
    /// Returns `None` on timeout.
    pub fn wait_idle_timeout(&self, timeout: Duration) -> Option<Option<RunStatus>> {
        self.shared.slot.wait_idle_timeout(timeout)
    }
}

impl Shared {
    /// Advance the active sequence until it waits or ends.
    fn drive(self: &Arc<Self>, state: &mut SlotState) {
        loop {
            let Some(sequence) = state.active.as_mut() else {
                return;
            };
            let id = sequence.id();
            let advance = sequence.run_next(&self.host, |step| {
                let listener: Arc<dyn ProcessListener> = Arc::new(StepListener {
                    shared: Arc::downgrade(self),
                    sequence: id,
                    step,
                });
                listener
            });

            match advance {
                Ok(Advance::Completed) => continue,
                Ok(Advance::Waiting) => return,
                Ok(Advance::Finished) => {
                    self.release(state, RunStatus::Finished);
                    return;
                }
                Err(e) => {
                    self.fail(state, e);
                    return;
                }
            }
        }
    }

    fn fail(&self, state: &mut SlotState, e: InvokerError) {
        let status = match e {
            InvokerError::Cancelled => RunStatus::Cancelled,
            InvokerError::ProcessFailed { ref command, code } => {
                info!("'{}' exited with code {}", command, code);
                RunStatus::Terminated
            }
            other => {
                error!("Sequence failed: {}", other);
                self.host.error_message(&format!("Invoker: {}", other));
                RunStatus::Failed
            }
        };
        self.release(state, status);
    }

    fn release(&self, state: &mut SlotState, status: RunStatus) {
        if let Some(sequence) = state.active.as_ref() {
            info!("Sequence {} ended: {}", sequence.id(), status);
        }
        self.slot.release(state, status);
        if status != RunStatus::Failed {
            self.post(status);
        }
    }

    fn post(&self, status: RunStatus) {
        self.host.status_message(&status.to_string());
    }
}

/// Routes process callbacks back to the step that spawned the process.
struct StepListener {
    shared: Weak<Shared>,
    sequence: u64,
    step: usize,
}

impl StepListener {
    fn matches(&self, state: &SlotState) -> bool {
        state
            .active
            .as_ref()
            .is_some_and(|s| s.id() == self.sequence)
    }
}

impl ProcessListener for StepListener {
    fn on_data(&self, chunk: &[u8]) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        let mut state = shared.slot.lock();
        let delivered = self.matches(&state)
            && state
                .active
                .as_mut()
                .is_some_and(|s| s.deliver_data(self.step, chunk));
        if !delivered {
            debug!(
                "Dropping {} byte(s) from stale step {} of sequence {}",
                chunk.len(),
                self.step,
                self.sequence
            );
        }
    }

    fn on_finished(&self, status: ExitStatus) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        let mut state = shared.slot.lock();
        let delivered = if self.matches(&state) {
            state
                .active
                .as_mut()
                .and_then(|s| s.deliver_finished(self.step, status))
        } else {
            None
        };

        match delivered {
            Some(Ok(())) => {
                debug!("Step {} of sequence {} finished", self.step, self.sequence);
                shared.drive(&mut state);
            }
            Some(Err(e)) => shared.fail(&mut state, e),
            None => debug!(
                "Dropping completion of stale step {} of sequence {}",
                self.step, self.sequence
            ),
        }
    }
}
