//! Run command implementation.
//!
//! The `invoker run` command loads a request file and runs its steps
//! against the terminal host, waiting until the sequence ends.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use console::style;
use tracing::{debug, warn};

use crate::cli::args::RunArgs;
use crate::config::load_request;
use crate::error::{InvokerError, Result};
use crate::host::TerminalHost;
use crate::runner::{Invoker, RunStatus};

use super::dispatcher::{Command, CommandResult};

/// Exit code when the run was cancelled for lack of a document.
const EXIT_CANCELLED: i32 = 2;

/// Exit code when `--timeout` aborted the run.
const EXIT_TIMED_OUT: i32 = 124;

/// The run command implementation.
pub struct RunCommand {
    document: Option<PathBuf>,
    variables: HashMap<String, String>,
    args: RunArgs,
}

impl RunCommand {
    /// Create a new run command.
    pub fn new(
        document: Option<PathBuf>,
        variables: HashMap<String, String>,
        args: RunArgs,
    ) -> Self {
        Self {
            document,
            variables,
            args,
        }
    }

    fn wait(&self, invoker: &Invoker) -> Option<RunStatus> {
        let Some(secs) = self.args.timeout else {
            return invoker.wait_idle();
        };

        match invoker.wait_idle_timeout(Duration::from_secs(secs)) {
            Some(outcome) => outcome,
            None => {
                warn!("Timed out after {}s", secs);
                invoker.abort();
                invoker.last_outcome()
            }
        }
    }
}

/// Map how a sequence ended to a process exit.
pub fn result_for(outcome: Option<RunStatus>) -> CommandResult {
    match outcome {
        Some(RunStatus::Finished) => CommandResult::success(),
        Some(RunStatus::Cancelled) => CommandResult::failure(EXIT_CANCELLED),
        Some(RunStatus::Aborted) => CommandResult::failure(EXIT_TIMED_OUT),
        _ => CommandResult::failure(1),
    }
}

impl Command for RunCommand {
    fn execute(&self) -> Result<CommandResult> {
        let request = match load_request(&self.args.file) {
            Ok(request) => request,
            Err(e @ InvokerError::RequestNotFound { .. }) => {
                eprintln!("{}", style(e).red());
                return Ok(CommandResult::failure(2));
            }
            Err(e) => return Err(e),
        };

        let host = TerminalHost::new(self.document.clone()).with_variables(self.variables.clone());
        let invoker = Invoker::new(Arc::new(host));

        invoker.start(request);
        let outcome = self.wait(&invoker);
        debug!("Run ended with {:?}", outcome);
        Ok(result_for(outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn command(dir: &TempDir, request: &str, timeout: Option<u64>) -> RunCommand {
        let file = dir.path().join("steps.json");
        fs::write(&file, request).unwrap();
        let document = dir.path().join("doc.txt");
        fs::write(&document, "").unwrap();
        RunCommand::new(
            Some(document),
            HashMap::new(),
            RunArgs { file, timeout },
        )
    }

    #[test]
    fn outcome_exit_codes() {
        assert_eq!(result_for(Some(RunStatus::Finished)).exit_code, 0);
        assert_eq!(result_for(Some(RunStatus::Terminated)).exit_code, 1);
        assert_eq!(result_for(Some(RunStatus::Failed)).exit_code, 1);
        assert_eq!(result_for(Some(RunStatus::Cancelled)).exit_code, 2);
        assert_eq!(result_for(Some(RunStatus::Aborted)).exit_code, 124);
        assert_eq!(result_for(None).exit_code, 1);
    }

    #[test]
    fn missing_request_file_fails() {
        let dir = TempDir::new().unwrap();
        let cmd = RunCommand::new(
            None,
            HashMap::new(),
            RunArgs {
                file: dir.path().join("nope.json"),
                timeout: None,
            },
        );
        let result = cmd.execute().unwrap();
        assert_eq!(result.exit_code, 2);
    }

    #[test]
    fn malformed_request_is_an_error() {
        let dir = TempDir::new().unwrap();
        let cmd = command(&dir, "{not json", None);
        assert!(matches!(
            cmd.execute(),
            Err(InvokerError::RequestParse { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn runs_process_to_completion() {
        let dir = TempDir::new().unwrap();
        let cmd = command(&dir, r#"{"kind": "process", "cmd": "true"}"#, None);
        let result = cmd.execute().unwrap();
        assert!(result.success);
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_fails() {
        let dir = TempDir::new().unwrap();
        let cmd = command(&dir, r#"{"kind": "process", "cmd": "exit 4"}"#, None);
        assert_eq!(cmd.execute().unwrap().exit_code, 1);
    }

    #[cfg(unix)]
    #[test]
    fn timeout_aborts_long_process() {
        let dir = TempDir::new().unwrap();
        let cmd = command(&dir, r#"{"kind": "process", "cmd": "sleep 30"}"#, Some(1));
        assert_eq!(cmd.execute().unwrap().exit_code, 124);
    }
}
