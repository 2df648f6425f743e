//! Terminal host used by the `invoker` binary.
//!
//! Panels are buffers that print to stdout while visible. Status and error
//! messages go to stderr.

use super::{process, Host, Panel, ProcessHandle, ProcessListener, SpawnRequest};
use console::style;
use serde_json::Value;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

const PANEL_PREFIX: &str = "output.";

/// Host backed by the current terminal.
pub struct TerminalHost {
    document: Option<PathBuf>,
    extra_variables: HashMap<String, String>,
    panels: Mutex<HashMap<String, Arc<TerminalPanel>>>,
}

impl TerminalHost {
    /// Create a host whose active document is `document`.
    ///
    /// A document that does not exist on disk counts as unsaved.
    pub fn new(document: Option<PathBuf>) -> Self {
        let document = document.and_then(|path| match path.canonicalize() {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Ignoring document {}: {}", path.display(), e);
                None
            }
        });

        Self {
            document,
            extra_variables: HashMap::new(),
            panels: Mutex::new(HashMap::new()),
        }
    }

    /// Add substitution variables on top of the document-derived ones.
    pub fn with_variables(mut self, vars: HashMap<String, String>) -> Self {
        self.extra_variables.extend(vars);
        self
    }

    fn panels(&self) -> MutexGuard<'_, HashMap<String, Arc<TerminalPanel>>> {
        self.panels.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn panel_by_address(&self, address: &str) -> Option<Arc<TerminalPanel>> {
        let name = address.strip_prefix(PANEL_PREFIX).unwrap_or(address);
        self.panels().get(name).cloned()
    }
}

/// Variables derived from a document path.
pub fn document_variables(document: &Path) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    vars.insert("file".to_string(), document.display().to_string());
    vars.insert(
        "file_path".to_string(),
        document
            .parent()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
    );
    vars.insert("file_name".to_string(), os_text(document.file_name()));
    vars.insert("file_base_name".to_string(), os_text(document.file_stem()));
    vars.insert("file_extension".to_string(), os_text(document.extension()));
    vars
}

fn os_text(s: Option<&OsStr>) -> String {
    s.map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

impl Host for TerminalHost {
    fn active_document(&self) -> Option<PathBuf> {
        self.document.clone()
    }

    fn variables(&self) -> HashMap<String, String> {
        let mut vars = HashMap::new();
        if let Ok(cwd) = std::env::current_dir() {
            vars.insert("folder".to_string(), cwd.display().to_string());
        }
        vars.insert("platform".to_string(), std::env::consts::OS.to_string());
        if let Some(document) = &self.document {
            vars.extend(document_variables(document));
        }
        vars.extend(self.extra_variables.clone());
        vars
    }

    fn run_command(&self, name: &str, args: Option<&Value>) {
        let arg = |key: &str| {
            args.and_then(|a| a.get(key))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        match name {
            "status_message" => self.status_message(&arg("text")),
            "show_panel" => self.show_panel(&arg("panel")),
            "hide_panel" => self.hide_panel(&arg("panel")),
            _ => warn!("Host command '{}' is not available in the terminal", name),
        }
    }

    fn find_panel(&self, name: &str) -> Option<Arc<dyn Panel>> {
        self.panels()
            .get(name)
            .cloned()
            .map(|p| p as Arc<dyn Panel>)
    }

    fn create_panel(&self, name: &str) -> Arc<dyn Panel> {
        debug!("Creating panel '{}'", name);
        let panel = Arc::new(TerminalPanel::new(name));
        self.panels().insert(name.to_string(), Arc::clone(&panel));
        panel
    }

    fn show_panel(&self, name: &str) {
        match self.panel_by_address(name) {
            Some(panel) => panel.set_visible(true),
            None => debug!("show_panel: no panel '{}'", name),
        }
    }

    fn hide_panel(&self, name: &str) {
        match self.panel_by_address(name) {
            Some(panel) => panel.set_visible(false),
            None => debug!("hide_panel: no panel '{}'", name),
        }
    }

    fn spawn_process(
        &self,
        request: SpawnRequest,
        listener: Arc<dyn ProcessListener>,
    ) -> std::io::Result<Box<dyn ProcessHandle>> {
        info!("Running: {}", request.command);
        let handle = process::spawn(&request, listener)?;
        Ok(Box::new(handle))
    }

    fn status_message(&self, text: &str) {
        eprintln!("{}", style(text).bold());
    }

    fn error_message(&self, text: &str) {
        eprintln!("{}", style(text).red().bold());
    }
}

#[derive(Debug, Default)]
struct PanelState {
    contents: String,
    printed: usize,
    visible: bool,
    read_only: bool,
    settings: HashMap<String, Value>,
}

/// Output panel that echoes to stdout while visible.
#[derive(Debug)]
pub struct TerminalPanel {
    name: String,
    state: Mutex<PanelState>,
}

impl TerminalPanel {
    /// Create a hidden, empty panel.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: Mutex::new(PanelState::default()),
        }
    }

    /// Panel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full buffered content.
    pub fn contents(&self) -> String {
        self.lock().contents.clone()
    }

    /// Whether the panel is currently shown.
    pub fn is_visible(&self) -> bool {
        self.lock().visible
    }

    fn lock(&self) -> MutexGuard<'_, PanelState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_visible(&self, visible: bool) {
        let mut state = self.lock();
        state.visible = visible;
        if visible {
            flush(&mut state);
        }
    }
}

/// Print whatever a visible panel has not printed yet.
fn flush(state: &mut PanelState) {
    if state.printed >= state.contents.len() {
        return;
    }
    let mut stdout = std::io::stdout().lock();
    let _ = stdout.write_all(state.contents[state.printed..].as_bytes());
    let _ = stdout.flush();
    state.printed = state.contents.len();
}

impl Panel for TerminalPanel {
    fn set_read_only(&self, read_only: bool) {
        self.lock().read_only = read_only;
    }

    fn clear(&self) {
        let mut state = self.lock();
        if state.read_only {
            warn!("Clearing read-only panel '{}'", self.name);
        }
        state.contents.clear();
        state.printed = 0;
    }

    fn set_setting(&self, key: &str, value: &Value) {
        debug!("Panel '{}': {} = {}", self.name, key, value);
        self.lock().settings.insert(key.to_string(), value.clone());
    }

    fn append(&self, text: &str) {
        let mut state = self.lock();
        state.contents.push_str(text);
        if state.visible {
            flush(&mut state);
        }
    }
}
