//! Integration tests running real processes through the controller.
#![cfg(unix)]

use invoker::config::{RunRequest, StepSpec};
use invoker::host::{
    self, Host, MockHost, Panel, ProcessHandle, ProcessListener, SpawnRequest,
};
use invoker::runner::{Invoker, RunStatus};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const WAIT: Duration = Duration::from_secs(20);

/// Records like `MockHost` but spawns real processes.
struct SpawningHost {
    inner: MockHost,
}

impl Host for SpawningHost {
    fn active_document(&self) -> Option<PathBuf> {
        self.inner.active_document()
    }

    fn variables(&self) -> HashMap<String, String> {
        self.inner.variables()
    }

    fn run_command(&self, name: &str, args: Option<&Value>) {
        self.inner.run_command(name, args)
    }

    fn find_panel(&self, name: &str) -> Option<Arc<dyn Panel>> {
        self.inner.find_panel(name)
    }

    fn create_panel(&self, name: &str) -> Arc<dyn Panel> {
        self.inner.create_panel(name)
    }

    fn show_panel(&self, name: &str) {
        self.inner.show_panel(name)
    }

    fn hide_panel(&self, name: &str) {
        self.inner.hide_panel(name)
    }

    fn spawn_process(
        &self,
        request: SpawnRequest,
        listener: Arc<dyn ProcessListener>,
    ) -> std::io::Result<Box<dyn ProcessHandle>> {
        Ok(Box::new(host::spawn(&request, listener)?))
    }

    fn status_message(&self, text: &str) {
        self.inner.status_message(text)
    }

    fn error_message(&self, text: &str) {
        self.inner.error_message(text)
    }
}

fn setup() -> (TempDir, Arc<SpawningHost>, Invoker) {
    let dir = TempDir::new().unwrap();
    let document = dir.path().join("notes.txt");
    fs::write(&document, "").unwrap();
    let host = Arc::new(SpawningHost {
        inner: MockHost::new().with_document(document),
    });
    let invoker = Invoker::new(host.clone());
    (dir, host, invoker)
}

fn request(value: Value) -> RunRequest {
    serde_json::from_value(value).unwrap()
}

#[test]
fn echo_streams_into_panel() {
    let (_dir, host, invoker) = setup();
    invoker.start(request(json!({
        "kind": "process",
        "cmd": "echo hello; echo world",
        "sink": {"type": "panel", "name": "out", "show": "on_write"}
    })));

    assert_eq!(invoker.wait_idle_timeout(WAIT), Some(Some(RunStatus::Finished)));
    let panel = host.inner.panel("out").unwrap();
    assert_eq!(panel.contents(), "hello\nworld");
    assert_eq!(host.inner.show_count("output.out"), 1);
    assert_eq!(host.inner.hide_count("output.out"), 0);
}

#[test]
fn process_runs_in_document_directory() {
    let (dir, host, invoker) = setup();
    invoker.start(request(json!({
        "kind": "process",
        "cmd": "pwd",
        "sink": {"type": "panel", "name": "out"}
    })));

    invoker.wait_idle_timeout(WAIT).unwrap();
    let expected = dir.path().canonicalize().unwrap();
    let printed = host.inner.panel("out").unwrap().contents();
    assert_eq!(PathBuf::from(printed).canonicalize().unwrap(), expected);
}

#[test]
fn failing_process_terminates_sequence() {
    let (_dir, host, invoker) = setup();
    invoker.start(vec![
        StepSpec::process("exit 3"),
        StepSpec::command("after", None),
    ]);

    assert_eq!(
        invoker.wait_idle_timeout(WAIT),
        Some(Some(RunStatus::Terminated))
    );
    assert!(host.inner.commands().is_empty());
}

#[test]
fn steps_follow_process_completion() {
    let (_dir, host, invoker) = setup();
    invoker.start(vec![
        StepSpec::process("true"),
        StepSpec::command("middle", None),
        StepSpec::process("true"),
        StepSpec::command("last", None),
    ]);

    assert_eq!(invoker.wait_idle_timeout(WAIT), Some(Some(RunStatus::Finished)));
    assert_eq!(host.inner.commands(), vec!["middle", "last"]);
}

#[test]
fn abort_kills_running_process() {
    let (_dir, host, invoker) = setup();
    invoker.start(request(json!({
        "steps": [
            {"kind": "process", "cmd": "sleep 30", "sink": {"type": "panel", "name": "out"}},
            {"kind": "command", "command": "never"}
        ]
    })));
    assert!(invoker.is_running());

    assert_eq!(invoker.abort(), RunStatus::Aborted);
    assert!(!invoker.is_running());

    // The killed process still reports back; that report must be ignored.
    std::thread::sleep(Duration::from_millis(300));
    assert!(host.inner.commands().is_empty());
    assert_eq!(invoker.last_outcome(), Some(RunStatus::Aborted));
    assert_eq!(host.inner.panel("out").unwrap().contents(), "Aborted.");
}

#[test]
fn missing_program_fails_sequence() {
    let (_dir, host, invoker) = setup();
    invoker.start(request(json!({
        "kind": "exec",
        "cmd": ["definitely-not-a-real-program-4821"]
    })));

    assert_eq!(invoker.last_outcome(), Some(RunStatus::Failed));
    assert_eq!(host.inner.errors().len(), 1);
}
