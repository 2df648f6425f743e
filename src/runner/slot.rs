//! Single-occupancy run slot.

use super::sequence::Sequence;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

/// Status strings posted to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Started,
    AlreadyRunning,
    Aborted,
    NothingToStop,
    /// No addressable document for a process step.
    Cancelled,
    /// A process exited with a nonzero code.
    Terminated,
    Finished,
    /// Configuration or spawn error; reported as an error message instead.
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunStatus::Started => "Started",
            RunStatus::AlreadyRunning => "Already running",
            RunStatus::Aborted => "Aborted",
            RunStatus::NothingToStop => "Nothing to stop",
            RunStatus::Cancelled => "Cancelled",
            RunStatus::Terminated => "Terminated",
            RunStatus::Finished => "Finished",
            RunStatus::Failed => "Failed",
        };
        write!(f, "{}", s)
    }
}

/// State guarded by the slot's lock.
#[derive(Default)]
pub struct SlotState {
    /// The sequence occupying the slot.
    pub active: Option<Sequence>,
    /// How the most recent sequence ended.
    pub last_outcome: Option<RunStatus>,
}

/// The process-wide slot: at most one active sequence.
///
/// Every create/check/clear happens under one mutex; the condvar wakes
/// waiters whenever the slot is released.
#[derive(Default)]
pub struct RunSlot {
    state: Mutex<SlotState>,
    released: Condvar,
}

impl RunSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the slot.
    pub fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Clear the slot and record how the sequence ended.
    pub fn release(&self, state: &mut SlotState, outcome: RunStatus) {
        state.active = None;
        state.last_outcome = Some(outcome);
        self.released.notify_all();
    }

    /// Block until the slot is empty; returns the last outcome.
    pub fn wait_idle(&self) -> Option<RunStatus> {
        let state = self
            .released
            .wait_while(self.lock(), |s| s.active.is_some())
            .unwrap_or_else(|e| e.into_inner());
        state.last_outcome
    }

    /// Like [`wait_idle`](Self::wait_idle) but gives up after `timeout`.
    ///
    /// Returns `None` on timeout.
    pub fn wait_idle_timeout(&self, timeout: Duration) -> Option<Option<RunStatus>> {
        let (state, result) = self
            .released
            .wait_timeout_while(self.lock(), timeout, |s| s.active.is_some())
            .unwrap_or_else(|e| e.into_inner());
        if result.timed_out() {
            None
        } else {
            Some(state.last_outcome)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn status_strings_match_host_messages() {
        assert_eq!(RunStatus::Started.to_string(), "Started");
        assert_eq!(RunStatus::AlreadyRunning.to_string(), "Already running");
        assert_eq!(RunStatus::NothingToStop.to_string(), "Nothing to stop");
        assert_eq!(RunStatus::Terminated.to_string(), "Terminated");
        assert_eq!(RunStatus::Cancelled.to_string(), "Cancelled");
        assert_eq!(RunStatus::Finished.to_string(), "Finished");
        assert_eq!(RunStatus::Aborted.to_string(), "Aborted");
    }

    #[test]
    fn wait_idle_returns_immediately_when_empty() {
        let slot = RunSlot::new();
        assert_eq!(slot.wait_idle(), None);
    }

    #[test]
    fn release_wakes_waiters() {
        let slot = Arc::new(RunSlot::new());
        slot.lock().active = Some(Sequence::new(1, Vec::new()));

        let waiter = {
            let slot = Arc::clone(&slot);
            thread::spawn(move || slot.wait_idle())
        };

        {
            let mut state = slot.lock();
            slot.release(&mut state, RunStatus::Finished);
        }
        assert_eq!(waiter.join().unwrap(), Some(RunStatus::Finished));
    }

    #[test]
    fn wait_idle_timeout_expires_while_occupied() {
        let slot = RunSlot::new();
        slot.lock().active = Some(Sequence::new(1, Vec::new()));
        assert_eq!(slot.wait_idle_timeout(Duration::from_millis(10)), None);
    }
}
