//! Recording host implementation for testing.
//!
//! `MockHost` implements the [`Host`] trait and captures every interaction
//! for later assertion. Spawned processes never run; tests drive them by
//! hand through [`MockProcess`].
//!
//! # Example
//!
//! ```
//! use invoker::host::{Host, MockHost};
//!
//! let host = MockHost::new().with_document("/work/main.rs");
//! host.status_message("Started");
//! assert_eq!(host.statuses(), vec!["Started".to_string()]);
//! assert!(host.active_document().is_some());
//! ```

use super::{ExitStatus, Host, Panel, ProcessHandle, ProcessListener, SpawnRequest};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// One recorded host interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Command { name: String, args: Option<Value> },
    PanelCreated(String),
    ShowPanel(String),
    HidePanel(String),
    Spawned(String),
    Status(String),
    Error(String),
}

#[derive(Default)]
struct Recorded {
    document: Option<PathBuf>,
    variables: HashMap<String, String>,
    events: Vec<HostEvent>,
    panels: HashMap<String, Arc<MockPanel>>,
    processes: Vec<MockProcess>,
    fail_spawn: bool,
}

/// Mock host for testing.
#[derive(Default)]
pub struct MockHost {
    inner: Mutex<Recorded>,
}

impl MockHost {
    /// Create a host with no active document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the active document path.
    pub fn with_document(self, path: impl Into<PathBuf>) -> Self {
        self.lock().document = Some(path.into());
        self
    }

    /// Add a substitution variable.
    pub fn with_variable(self, name: &str, value: &str) -> Self {
        self.lock()
            .variables
            .insert(name.to_string(), value.to_string());
        self
    }

    /// Pre-create a panel, as if left over from an earlier run.
    pub fn with_panel(self, name: &str, content: &str) -> Self {
        let panel = Arc::new(MockPanel::default());
        panel.append(content);
        self.lock().panels.insert(name.to_string(), panel);
        self
    }

    /// Make every subsequent spawn fail.
    pub fn fail_spawns(&self) {
        self.lock().fail_spawn = true;
    }

    /// Get all recorded events in order.
    pub fn events(&self) -> Vec<HostEvent> {
        self.lock().events.clone()
    }

    /// Get all status messages.
    pub fn statuses(&self) -> Vec<String> {
        self.filter(|e| match e {
            HostEvent::Status(text) => Some(text.clone()),
            _ => None,
        })
    }

    /// Get the most recent status message.
    pub fn last_status(&self) -> Option<String> {
        self.statuses().pop()
    }

    /// Get all error messages.
    pub fn errors(&self) -> Vec<String> {
        self.filter(|e| match e {
            HostEvent::Error(text) => Some(text.clone()),
            _ => None,
        })
    }

    /// Get the names of all host commands run.
    pub fn commands(&self) -> Vec<String> {
        self.filter(|e| match e {
            HostEvent::Command { name, .. } => Some(name.clone()),
            _ => None,
        })
    }

    /// Count `ShowPanel` events for a panel.
    pub fn show_count(&self, panel: &str) -> usize {
        self.count(|e| matches!(e, HostEvent::ShowPanel(name) if name == panel))
    }

    /// Count `HidePanel` events for a panel.
    pub fn hide_count(&self, panel: &str) -> usize {
        self.count(|e| matches!(e, HostEvent::HidePanel(name) if name == panel))
    }

    /// Count panels created (not reused).
    pub fn panels_created(&self) -> usize {
        self.count(|e| matches!(e, HostEvent::PanelCreated(_)))
    }

    /// Get a panel by name.
    pub fn panel(&self, name: &str) -> Option<Arc<MockPanel>> {
        self.lock().panels.get(name).cloned()
    }

    /// Number of processes spawned so far.
    pub fn spawn_count(&self) -> usize {
        self.lock().processes.len()
    }

    /// Get a spawned process by index.
    pub fn process(&self, index: usize) -> Option<MockProcess> {
        self.lock().processes.get(index).cloned()
    }

    /// Get the most recently spawned process.
    pub fn last_process(&self) -> Option<MockProcess> {
        self.lock().processes.last().cloned()
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, event: HostEvent) {
        self.lock().events.push(event);
    }

    fn filter(&self, f: impl Fn(&HostEvent) -> Option<String>) -> Vec<String> {
        self.lock().events.iter().filter_map(f).collect()
    }

    fn count(&self, f: impl Fn(&HostEvent) -> bool) -> usize {
        self.lock().events.iter().filter(|e| f(e)).count()
    }
}

impl Host for MockHost {
    fn active_document(&self) -> Option<PathBuf> {
        self.lock().document.clone()
    }

    fn variables(&self) -> HashMap<String, String> {
        self.lock().variables.clone()
    }

    fn run_command(&self, name: &str, args: Option<&Value>) {
        self.record(HostEvent::Command {
            name: name.to_string(),
            args: args.cloned(),
        });
    }

    fn find_panel(&self, name: &str) -> Option<Arc<dyn Panel>> {
        self.panel(name).map(|p| p as Arc<dyn Panel>)
    }

    fn create_panel(&self, name: &str) -> Arc<dyn Panel> {
        let panel = Arc::new(MockPanel::default());
        let mut inner = self.lock();
        inner.panels.insert(name.to_string(), Arc::clone(&panel));
        inner.events.push(HostEvent::PanelCreated(name.to_string()));
        panel
    }

    fn show_panel(&self, name: &str) {
        self.record(HostEvent::ShowPanel(name.to_string()));
    }

    fn hide_panel(&self, name: &str) {
        self.record(HostEvent::HidePanel(name.to_string()));
    }

    fn spawn_process(
        &self,
        request: SpawnRequest,
        listener: Arc<dyn ProcessListener>,
    ) -> std::io::Result<Box<dyn ProcessHandle>> {
        let mut inner = self.lock();
        if inner.fail_spawn {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "spawning disabled",
            ));
        }

        inner
            .events
            .push(HostEvent::Spawned(request.command.to_string()));
        let process = MockProcess {
            request,
            listener,
            kills: Arc::new(AtomicUsize::new(0)),
        };
        inner.processes.push(process.clone());
        Ok(Box::new(MockKillHandle(Arc::clone(&process.kills))))
    }

    fn status_message(&self, text: &str) {
        self.record(HostEvent::Status(text.to_string()));
    }

    fn error_message(&self, text: &str) {
        self.record(HostEvent::Error(text.to_string()));
    }
}

/// A process "spawned" by [`MockHost`].
#[derive(Clone)]
pub struct MockProcess {
    /// What the controller asked to spawn.
    pub request: SpawnRequest,
    listener: Arc<dyn ProcessListener>,
    kills: Arc<AtomicUsize>,
}

impl MockProcess {
    /// Deliver an output chunk.
    pub fn emit(&self, chunk: &[u8]) {
        self.listener.on_data(chunk);
    }

    /// Deliver process completion.
    pub fn finish(&self, status: ExitStatus) {
        self.listener.on_finished(status);
    }

    /// How many times the controller killed this process.
    pub fn kill_count(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }
}

struct MockKillHandle(Arc<AtomicUsize>);

impl ProcessHandle for MockKillHandle {
    fn kill(&mut self) -> std::io::Result<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct PanelState {
    appends: Vec<String>,
    read_only: bool,
    clears: usize,
    settings: HashMap<String, Value>,
}

/// Panel created by [`MockHost`].
#[derive(Debug, Default)]
pub struct MockPanel {
    state: Mutex<PanelState>,
}

impl MockPanel {
    fn lock(&self) -> MutexGuard<'_, PanelState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Every append call, in order.
    pub fn appends(&self) -> Vec<String> {
        self.lock().appends.clone()
    }

    /// Concatenated content.
    pub fn contents(&self) -> String {
        self.lock().appends.concat()
    }

    /// Whether the panel is read-only.
    pub fn is_read_only(&self) -> bool {
        self.lock().read_only
    }

    /// How many times the panel was cleared.
    pub fn clear_count(&self) -> usize {
        self.lock().clears
    }

    /// Get an applied setting.
    pub fn setting(&self, key: &str) -> Option<Value> {
        self.lock().settings.get(key).cloned()
    }
}

impl Panel for MockPanel {
    fn set_read_only(&self, read_only: bool) {
        self.lock().read_only = read_only;
    }

    fn clear(&self) {
        let mut state = self.lock();
        state.appends.clear();
        state.clears += 1;
    }

    fn set_setting(&self, key: &str, value: &Value) {
        self.lock().settings.insert(key.to_string(), value.clone());
    }

    fn append(&self, text: &str) {
        self.lock().appends.push(text.to_string());
    }
}
