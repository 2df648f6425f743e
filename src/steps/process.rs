//! External process step.

use super::{StepContext, StepOutcome};
use crate::config::{expand_variables, ProcessParams, StepSpec};
use crate::error::{InvokerError, Result};
use crate::host::{ExitStatus, ProcessHandle, SpawnRequest};
use crate::sink::{build_sink, VisibilityPolicy};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const ABORTED_LINE: &str = "Aborted.";

/// Spawns a process and streams its output into an optional sink.
#[derive(Default)]
pub struct ProcessStep {
    command: String,
    policy: Option<VisibilityPolicy>,
    handle: Option<Box<dyn ProcessHandle>>,
    decoder: Utf8Decoder,
}

impl ProcessStep {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the step has a live process.
    pub fn is_spawned(&self) -> bool {
        self.handle.is_some()
    }

    /// Validate, build the sink, and spawn.
    ///
    /// Nothing is spawned without an addressable document, and nothing is
    /// created when the configuration is invalid.
    pub fn run(&mut self, spec: &StepSpec, ctx: &StepContext) -> Result<StepOutcome> {
        let document = ctx.host.active_document().ok_or(InvokerError::Cancelled)?;
        let params: ProcessParams = spec.parse_params()?;

        let vars = ctx.host.variables();
        let command = params.cmd.map(|part| expand_variables(part, &vars));
        let env = params
            .options
            .env
            .iter()
            .map(|(k, v)| (k.clone(), expand_variables(v, &vars)))
            .collect();
        self.command = command.to_string();

        self.policy = params
            .sink
            .as_ref()
            .map(|config| build_sink(ctx.host.clone(), config))
            .transpose()?;

        let request = SpawnRequest {
            command,
            cwd: working_directory(&document),
            env,
            path: params.options.path.clone(),
        };

        debug!("Spawning: {}", self.command);
        match ctx.host.spawn_process(request, ctx.listener.clone()) {
            Ok(handle) => {
                self.handle = Some(handle);
                Ok(StepOutcome::Pending)
            }
            Err(source) => {
                if let Some(policy) = self.policy.as_mut() {
                    policy.finish();
                }
                Err(InvokerError::SpawnFailed {
                    command: self.command.clone(),
                    source,
                })
            }
        }
    }

    /// Forward a chunk of output to the sink.
    pub fn on_data(&mut self, chunk: &[u8]) {
        let text = self.decoder.decode(chunk);
        if text.is_empty() {
            return;
        }
        if let Some(policy) = self.policy.as_mut() {
            policy.write(&text);
        }
    }

    /// Close the sink and classify the exit status.
    pub fn on_finished(&mut self, status: ExitStatus) -> Result<()> {
        self.handle = None;
        let rest = self.decoder.flush();
        if let Some(policy) = self.policy.as_mut() {
            if !rest.is_empty() {
                policy.write(&rest);
            }
            policy.finish();
        }

        match status {
            ExitStatus::Code(code) if status.is_failure() => Err(InvokerError::ProcessFailed {
                command: self.command.clone(),
                code,
            }),
            _ => Ok(()),
        }
    }

    /// Kill the process and close the sink.
    pub fn stop(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            if let Err(e) = handle.kill() {
                warn!("Failed to kill '{}': {}", self.command, e);
            }
        }

        let rest = self.decoder.flush();
        if let Some(policy) = self.policy.as_mut() {
            policy.write(&rest);
            policy.write(ABORTED_LINE);
            policy.finish();
        }
    }
}

/// Directory of the document, if it is usable as a working directory.
fn working_directory(document: &Path) -> Option<PathBuf> {
    let dir = document.parent()?;
    let checked = std::fs::metadata(dir).and_then(|meta| {
        if meta.is_dir() {
            Ok(())
        } else {
            Err(std::io::Error::new(
                std::io::ErrorKind::NotADirectory,
                "not a directory",
            ))
        }
    });

    match checked {
        Ok(()) => Some(dir.to_path_buf()),
        Err(source) => {
            let warning = InvokerError::WorkingDirectory {
                path: dir.to_path_buf(),
                source,
            };
            warn!("{}", warning);
            None
        }
    }
}

/// Lossy UTF-8 decoding that keeps a character split across chunks intact.
#[derive(Debug, Default)]
struct Utf8Decoder {
    partial: Vec<u8>,
}

impl Utf8Decoder {
    fn decode(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.partial);
        bytes.extend_from_slice(chunk);
        let keep = incomplete_tail(&bytes);
        self.partial = bytes.split_off(bytes.len() - keep);
        String::from_utf8_lossy(&bytes).into_owned()
    }

    fn flush(&mut self) -> String {
        let bytes = std::mem::take(&mut self.partial);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

/// Length of a truncated multi-byte sequence at the end of `bytes`.
fn incomplete_tail(bytes: &[u8]) -> usize {
    for k in 1..=bytes.len().min(3) {
        let byte = bytes[bytes.len() - k];
        if byte & 0xC0 == 0x80 {
            continue;
        }
        let needed = match byte {
            0xC2..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF4 => 4,
            _ => return 0,
        };
        return if needed > k { k } else { 0 };
    }
    0
}
