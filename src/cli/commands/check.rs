//! Check command implementation.
//!
//! The `invoker check` command validates every step of a request file
//! the way dispatch would, without running anything.

use console::style;

use crate::cli::args::CheckArgs;
use crate::config::{load_request, StepSpec};
use crate::error::{InvokerError, Result};
use crate::steps::Step;

use super::dispatcher::{Command, CommandResult};

/// The check command implementation.
pub struct CheckCommand {
    args: CheckArgs,
}

impl CheckCommand {
    /// Create a new check command.
    pub fn new(args: CheckArgs) -> Self {
        Self { args }
    }
}

/// Validate each step, returning one line per step and the error count.
pub fn check_steps(steps: &[StepSpec]) -> (Vec<String>, usize) {
    let mut lines = Vec::with_capacity(steps.len());
    let mut errors = 0;

    for (i, spec) in steps.iter().enumerate() {
        match Step::check(spec) {
            Ok(kind) => lines.push(format!(
                "{} {}. {}",
                style("✓").green(),
                i + 1,
                kind
            )),
            Err(e) => {
                errors += 1;
                lines.push(format!("{} {}. {}", style("✗").red(), i + 1, e));
            }
        }
    }
    (lines, errors)
}

impl Command for CheckCommand {
    fn execute(&self) -> Result<CommandResult> {
        let request = match load_request(&self.args.file) {
            Ok(request) => request,
            Err(e @ InvokerError::RequestNotFound { .. }) => {
                eprintln!("{}", style(e).red());
                return Ok(CommandResult::failure(2));
            }
            Err(e) => return Err(e),
        };

        let steps = request.into_steps();
        let (lines, errors) = check_steps(&steps);
        for line in &lines {
            println!("{}", line);
        }

        if errors == 0 {
            println!("{} step(s) OK", steps.len());
            Ok(CommandResult::success())
        } else {
            println!("{} of {} step(s) invalid", errors, steps.len());
            Ok(CommandResult::failure(1))
        }
    }
}
