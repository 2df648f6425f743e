//! Run request schema definitions.
//!
//! A run request is either a single step or `{steps: [...]}`. Steps are kept
//! loosely typed (`kind` plus a parameter map) until they are dispatched, so
//! a malformed third step only fails the run once the first two have run.

use crate::error::{InvokerError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A request to run one or more steps in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RunRequest {
    /// Ordered list of steps.
    Sequence {
        #[serde(alias = "actions")]
        steps: Vec<StepSpec>,
    },

    /// Shorthand for a one-step sequence.
    Single(StepSpec),
}

impl RunRequest {
    /// Flatten the request into its ordered step list.
    pub fn into_steps(self) -> Vec<StepSpec> {
        match self {
            RunRequest::Sequence { steps } => steps,
            RunRequest::Single(step) => vec![step],
        }
    }
}

impl From<Vec<StepSpec>> for RunRequest {
    fn from(steps: Vec<StepSpec>) -> Self {
        RunRequest::Sequence { steps }
    }
}

impl From<StepSpec> for RunRequest {
    fn from(step: StepSpec) -> Self {
        RunRequest::Single(step)
    }
}

/// One unvalidated step specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSpec {
    /// Step discriminator (`command`/`sublime` or `process`/`exec`).
    #[serde(default, alias = "type")]
    pub kind: String,

    /// Every other key of the step.
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl StepSpec {
    /// Build a spec from a JSON object.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| InvokerError::config(format!("invalid step: {}", e)))
    }

    /// A host command step.
    pub fn command(name: &str, args: Option<Value>) -> Self {
        let mut params = Map::new();
        params.insert("command".to_string(), Value::String(name.to_string()));
        if let Some(args) = args {
            params.insert("args".to_string(), args);
        }
        Self {
            kind: "command".to_string(),
            params,
        }
    }

    /// A process step without a sink.
    pub fn process(cmd: &str) -> Self {
        let mut params = Map::new();
        params.insert("cmd".to_string(), Value::String(cmd.to_string()));
        Self {
            kind: "process".to_string(),
            params,
        }
    }

    /// Resolve the discriminator.
    pub fn step_kind(&self) -> Result<StepKind> {
        StepKind::parse(&self.kind)
    }

    /// Deserialize the parameters into a typed parameter struct.
    pub fn parse_params<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.params.clone())).map_err(|e| {
            InvokerError::config(format!("invalid \"{}\" step: {}", self.kind, e))
        })
    }
}

/// Which step variant a spec dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// Synchronous host command.
    Command,
    /// Asynchronous external process.
    Process,
}

impl StepKind {
    /// Parse a step discriminator.
    pub fn parse(kind: &str) -> Result<Self> {
        match kind {
            "command" | "sublime" => Ok(StepKind::Command),
            "process" | "exec" => Ok(StepKind::Process),
            _ => Err(InvokerError::config(
                r#"kind must be either "command" or "process""#,
            )),
        }
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StepKind::Command => "command",
            StepKind::Process => "process",
        };
        write!(f, "{}", s)
    }
}

/// Parameters of a command step.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommandParams {
    /// Host command name.
    #[serde(alias = "commandName")]
    pub command: String,

    /// Arguments passed through to the host untouched.
    #[serde(default)]
    pub args: Option<Value>,
}

/// Parameters of a process step.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProcessParams {
    /// Command line to run.
    #[serde(alias = "commandLine", alias = "command_line")]
    pub cmd: CommandLine,

    /// Optional output sink.
    #[serde(default)]
    pub sink: Option<SinkConfig>,

    /// Spawn options.
    #[serde(flatten)]
    pub options: ProcessOptions,
}

/// A command line, either for the shell or as a ready argv.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandLine {
    /// Run through the platform shell.
    Shell(String),
    /// Executed directly, first element is the program.
    Argv(Vec<String>),
}

impl CommandLine {
    /// Apply `f` to every textual part of the command line.
    pub fn map(&self, f: impl Fn(&str) -> String) -> Self {
        match self {
            CommandLine::Shell(line) => CommandLine::Shell(f(line)),
            CommandLine::Argv(argv) => CommandLine::Argv(argv.iter().map(|a| f(a)).collect()),
        }
    }
}

impl std::fmt::Display for CommandLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandLine::Shell(line) => write!(f, "{}", line),
            CommandLine::Argv(argv) => write!(f, "{}", argv.join(" ")),
        }
    }
}

/// Options forwarded to the process spawner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessOptions {
    /// Extra environment variables, merged over the inherited environment.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    /// Directories prepended to `PATH`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Raw sink configuration of a process step.
///
/// `show` and `hide` stay untyped here; they are validated into triggers
/// right before the sink is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink type; only `"panel"` is supported.
    #[serde(rename = "type")]
    pub sink_type: String,

    /// Panel name.
    pub name: String,

    /// `true`, `false` or `"on_write"`.
    #[serde(default = "default_show")]
    pub show: Value,

    /// `true`, `false` or `"if_empty"`.
    #[serde(default = "default_hide")]
    pub hide: Value,

    /// Passed through to the panel as settings.
    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

fn default_show() -> Value {
    Value::Bool(true)
}

fn default_hide() -> Value {
    Value::String("if_empty".to_string())
}
