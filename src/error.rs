//! Error types for Invoker operations.
//!
//! This module defines [`InvokerError`], the error type used throughout
//! the crate, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Configuration problems are raised before any external side effect
//!   commits (no panel created, no process spawned)
//! - Runtime outcomes (`Cancelled`, `ProcessFailed`) end the current run
//!   and are reported as status strings
//! - `WorkingDirectory` is never propagated; it is only logged
//! - Nothing escapes to the host: the controller converts every error into
//!   a user-visible message at its boundary

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for Invoker operations.
#[derive(Debug, Error)]
pub enum InvokerError {
    /// Invalid step kind, sink type, or sink visibility value.
    #[error("{message}")]
    Configuration { message: String },

    /// The execution context has no addressable document.
    #[error("Cancelled: the active document has no file on disk")]
    Cancelled,

    /// Process exited with a nonzero exit code.
    #[error("Command exited with code {code}: {command}")]
    ProcessFailed { command: String, code: i32 },

    /// Process could not be started at all.
    #[error("Failed to start '{command}': {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The spawn working directory could not be used.
    #[error("Cannot use working directory {path}: {source}")]
    WorkingDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Run request file not found.
    #[error("Run request not found: {path}")]
    RequestNotFound { path: PathBuf },

    /// Run request file could not be parsed.
    #[error("Failed to parse run request at {path}: {message}")]
    RequestParse { path: PathBuf, message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl InvokerError {
    /// Shorthand for a [`InvokerError::Configuration`] error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

/// Result type alias for Invoker operations.
pub type Result<T> = std::result::Result<T, InvokerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_error_displays_message_verbatim() {
        let err = InvokerError::config(r#"sink.show must be true, false, or "on_write""#);
        assert_eq!(
            err.to_string(),
            r#"sink.show must be true, false, or "on_write""#
        );
    }

    #[test]
    fn process_failed_displays_command_and_code() {
        let err = InvokerError::ProcessFailed {
            command: "make test".into(),
            code: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("make test"));
        assert!(msg.contains('2'));
    }

    #[test]
    fn spawn_failed_keeps_source() {
        let err = InvokerError::SpawnFailed {
            command: "nope".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        assert!(err.to_string().contains("no such file"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn working_directory_displays_path() {
        let err = InvokerError::WorkingDirectory {
            path: PathBuf::from("/gone"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().contains("/gone"));
    }

    #[test]
    fn request_parse_displays_path_and_message() {
        let err = InvokerError::RequestParse {
            path: PathBuf::from("/run.yml"),
            message: "invalid syntax".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/run.yml"));
        assert!(msg.contains("invalid syntax"));
    }

    #[test]
    fn io_error_converts_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: InvokerError = io_err.into();
        assert!(matches!(err, InvokerError::Io(_)));
    }
}
