//! Host services the controller depends on.
//!
//! The controller never talks to an editor, a terminal, or the OS directly.
//! Everything goes through the [`Host`] trait:
//!
//! - [`Host`] - document, variables, commands, panels, spawning, messages
//! - [`Panel`] - a named text area owned by the host
//! - [`ProcessListener`] - receives a spawned process's output and exit
//! - [`ProcessHandle`] - lets the controller kill what it spawned
//!
//! Implementations:
//!
//! - [`TerminalHost`] for the `invoker` binary
//! - [`MockHost`] for tests

pub mod mock;
pub mod process;
pub mod terminal;

pub use mock::{HostEvent, MockHost, MockPanel, MockProcess};
pub use process::{spawn, ChildHandle};
pub use terminal::{TerminalHost, TerminalPanel};

use crate::config::CommandLine;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

/// Exit status reported by a finished process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Process exited with a code.
    Code(i32),
    /// No code available (e.g. killed by a signal).
    Unknown,
}

impl ExitStatus {
    /// Only a nonzero code is a failure; an unknown status is not.
    pub fn is_failure(&self) -> bool {
        matches!(self, ExitStatus::Code(code) if *code != 0)
    }
}

impl From<Option<i32>> for ExitStatus {
    fn from(code: Option<i32>) -> Self {
        code.map_or(ExitStatus::Unknown, ExitStatus::Code)
    }
}

/// Everything needed to start a process.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRequest {
    /// Command line, already variable-expanded.
    pub command: CommandLine,

    /// Working directory (None = inherit).
    pub cwd: Option<PathBuf>,

    /// Extra environment variables.
    pub env: BTreeMap<String, String>,

    /// Directories prepended to `PATH`.
    pub path: Option<String>,
}

/// Receives the output and completion of one spawned process.
///
/// Calls for one process arrive in order and `on_finished` is always last.
/// They may arrive on any thread.
pub trait ProcessListener: Send + Sync {
    /// A chunk of raw output (stdout and stderr interleaved).
    fn on_data(&self, chunk: &[u8]);

    /// The process has exited.
    fn on_finished(&self, status: ExitStatus);
}

/// Handle to a spawned process.
pub trait ProcessHandle: Send {
    /// Forcibly terminate the process. Does not wait for it to exit.
    fn kill(&mut self) -> std::io::Result<()>;
}

/// A named output panel owned by the host.
pub trait Panel: Send + Sync {
    /// Toggle user edits.
    fn set_read_only(&self, read_only: bool);

    /// Remove all content.
    fn clear(&self);

    /// Apply one view setting.
    fn set_setting(&self, key: &str, value: &Value);

    /// Append text at the end.
    fn append(&self, text: &str);
}

/// Host environment the steps run against.
pub trait Host: Send + Sync {
    /// Path of the active document, if it exists on disk.
    fn active_document(&self) -> Option<PathBuf>;

    /// Substitution map for command lines.
    fn variables(&self) -> HashMap<String, String>;

    /// Run a host command synchronously.
    fn run_command(&self, name: &str, args: Option<&Value>);

    /// Look up an existing panel.
    fn find_panel(&self, name: &str) -> Option<Arc<dyn Panel>>;

    /// Create a new panel.
    fn create_panel(&self, name: &str) -> Arc<dyn Panel>;

    /// Make a panel visible.
    fn show_panel(&self, name: &str);

    /// Hide a panel.
    fn hide_panel(&self, name: &str);

    /// Spawn a process that reports to `listener`.
    fn spawn_process(
        &self,
        request: SpawnRequest,
        listener: Arc<dyn ProcessListener>,
    ) -> std::io::Result<Box<dyn ProcessHandle>>;

    /// Short status line.
    fn status_message(&self, text: &str);

    /// Error shown prominently.
    fn error_message(&self, text: &str);
}
