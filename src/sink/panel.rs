//! Panel-backed sink.

use super::Sink;
use crate::host::{Host, Panel};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

/// A named host panel.
///
/// Writes are line-buffered across chunks: a trailing newline is held back
/// and emitted in front of the next write, so the panel never ends in an
/// empty line.
pub struct PanelSink {
    host: Arc<dyn Host>,
    panel: Arc<dyn Panel>,
    address: String,
    pending_newline: bool,
}

impl PanelSink {
    /// Reuse the panel called `name` (cleared) or create it, then apply
    /// `settings`.
    pub fn new(host: Arc<dyn Host>, name: &str, settings: &Map<String, Value>) -> Self {
        let panel = match host.find_panel(name) {
            Some(panel) => {
                debug!("Reusing panel '{}'", name);
                panel.set_read_only(false);
                panel.clear();
                panel
            }
            None => host.create_panel(name),
        };

        panel.set_read_only(true);
        for (key, value) in settings {
            panel.set_setting(key, value);
        }

        Self {
            host,
            panel,
            address: format!("output.{}", name),
            pending_newline: false,
        }
    }

    /// Address used with the host's show/hide operations.
    pub fn address(&self) -> &str {
        &self.address
    }
}

/// Apply line buffering to one chunk.
///
/// Returns the text to emit and whether a newline is now pending.
fn buffer_chunk(text: &str, pending_newline: bool) -> (String, bool) {
    let mut out = text.replace("\r\n", "\n");
    if pending_newline {
        out.insert(0, '\n');
    }
    match out.strip_suffix('\n') {
        Some(stripped) => (stripped.to_string(), true),
        None => (out, false),
    }
}

impl Sink for PanelSink {
    fn write(&mut self, text: &str) {
        let (out, pending) = buffer_chunk(text, self.pending_newline);
        self.pending_newline = pending;
        self.panel.append(&out);
    }

    fn show(&mut self) {
        self.host.show_panel(&self.address);
    }

    fn hide(&mut self) {
        self.host.hide_panel(&self.address);
    }
}
