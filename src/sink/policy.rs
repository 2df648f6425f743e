//! Show/hide policy wrapped around a sink.

use super::Sink;
use crate::error::{InvokerError, Result};
use serde_json::Value;
use std::fmt;

/// When a sink becomes visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowTrigger {
    Never,
    AtConstruction,
    OnFirstWrite,
}

impl ShowTrigger {
    /// Parse `true`, `false` or `"on_write"`.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Bool(true) => Ok(ShowTrigger::AtConstruction),
            Value::Bool(false) => Ok(ShowTrigger::Never),
            Value::String(s) if s == "on_write" => Ok(ShowTrigger::OnFirstWrite),
            _ => Err(InvokerError::config(
                r#"sink.show must be true, false, or "on_write""#,
            )),
        }
    }
}

/// When a sink is hidden again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HideTrigger {
    Never,
    AtFinish,
    IfNeverWrittenNonEmpty,
}

impl HideTrigger {
    /// Parse `true`, `false` or `"if_empty"`.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Bool(true) => Ok(HideTrigger::AtFinish),
            Value::Bool(false) => Ok(HideTrigger::Never),
            Value::String(s) if s == "if_empty" => Ok(HideTrigger::IfNeverWrittenNonEmpty),
            _ => Err(InvokerError::config(
                r#"sink.hide must be true, false, or "if_empty""#,
            )),
        }
    }
}

/// Wraps a sink and calls `show`/`hide` at the configured moments.
///
/// `OnFirstWrite` fires at most once; the written flag only ever goes
/// from false to true.
pub struct VisibilityPolicy {
    sink: Box<dyn Sink>,
    show: ShowTrigger,
    hide: HideTrigger,
    show_pending: bool,
    written: bool,
}

impl VisibilityPolicy {
    /// Wrap `sink`, showing it immediately for `AtConstruction`.
    pub fn new(mut sink: Box<dyn Sink>, show: ShowTrigger, hide: HideTrigger) -> Self {
        if show == ShowTrigger::AtConstruction {
            sink.show();
        }

        Self {
            sink,
            show,
            hide,
            show_pending: show == ShowTrigger::OnFirstWrite,
            written: false,
        }
    }

    pub fn show_trigger(&self) -> ShowTrigger {
        self.show
    }

    pub fn hide_trigger(&self) -> HideTrigger {
        self.hide
    }

    /// Forward text to the sink.
    ///
    /// Empty text is ignored and does not trigger `OnFirstWrite`.
    pub fn write(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }

        if self.show_pending {
            self.sink.show();
            self.show_pending = false;
        }
        self.sink.write(text);
        self.written = true;
    }

    /// Apply the hide trigger.
    pub fn finish(&mut self) {
        let hide = match self.hide {
            HideTrigger::Never => false,
            HideTrigger::AtFinish => true,
            HideTrigger::IfNeverWrittenNonEmpty => !self.written,
        };
        if hide {
            self.sink.hide();
        }
    }
}

impl fmt::Debug for VisibilityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisibilityPolicy")
            .field("show", &self.show)
            .field("hide", &self.hide)
            .field("show_pending", &self.show_pending)
            .field("written", &self.written)
            .finish_non_exhaustive()
    }
}
