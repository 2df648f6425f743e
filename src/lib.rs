//! Invoker - Run heterogeneous steps one at a time.
//!
//! A sequence mixes synchronous host commands with external processes.
//! Exactly one step runs at a time, the next starts only after the current
//! one reports completion, and a running sequence can be aborted. Process
//! output can stream into a panel whose visibility follows a small policy.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Request schema, loading and variable expansion
//! - [`error`] - Error types and result aliases
//! - [`host`] - Host interfaces, terminal host, process spawning, mock host
//! - [`runner`] - Run slot, sequence state machine and the controller
//! - [`sink`] - Output sinks and their visibility policy
//! - [`steps`] - Command and process steps
//!
//! # Example
//!
//! ```
//! use invoker::config::StepSpec;
//! use invoker::host::{ExitStatus, MockHost};
//! use invoker::runner::{Invoker, RunStatus};
//! use std::sync::Arc;
//!
//! let host = Arc::new(MockHost::new().with_document("/tmp/notes.txt"));
//! let invoker = Invoker::new(host.clone());
//!
//! invoker.start(vec![StepSpec::process("make"), StepSpec::command("save", None)]);
//! assert!(invoker.is_running());
//!
//! host.last_process().unwrap().finish(ExitStatus::Code(0));
//! assert_eq!(invoker.last_outcome(), Some(RunStatus::Finished));
//! assert_eq!(host.commands(), vec!["save"]);
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod host;
pub mod runner;
pub mod sink;
pub mod steps;

pub use error::{InvokerError, Result};
