//! Integration tests for sequencing through the public API.

use invoker::config::{RunRequest, StepSpec};
use invoker::host::{ExitStatus, HostEvent, MockHost};
use invoker::runner::{ContextOperator, Invoker, RunStatus, RUNNING_CONTEXT_KEY};
use serde_json::json;
use std::sync::Arc;

fn setup() -> (Arc<MockHost>, Invoker) {
    let host = Arc::new(MockHost::new().with_document("/tmp/project/main.c"));
    let invoker = Invoker::new(host.clone());
    (host, invoker)
}

fn request(value: serde_json::Value) -> RunRequest {
    serde_json::from_value(value).unwrap()
}

#[test]
fn public_api_accessible() {
    let (_host, invoker) = setup();
    assert!(!invoker.is_running());
    assert_eq!(invoker.cursor(), None);
    assert_eq!(invoker.last_outcome(), None);
}

#[test]
fn on_write_panel_shown_by_output_and_kept() {
    let (host, invoker) = setup();
    invoker.start(request(json!({
        "kind": "process",
        "commandLine": "echo hi",
        "sink": {"type": "panel", "name": "out", "show": "on_write", "hide": "if_empty"}
    })));

    assert_eq!(host.show_count("output.out"), 0);
    let process = host.last_process().unwrap();
    process.emit(b"hi\n");
    assert_eq!(host.show_count("output.out"), 1);
    assert_eq!(host.panel("out").unwrap().appends(), vec!["hi"]);

    process.finish(ExitStatus::Code(0));
    assert_eq!(host.hide_count("output.out"), 0);
    assert_eq!(host.last_status().as_deref(), Some("Finished"));
}

#[test]
fn silent_process_hides_if_empty_panel() {
    let (host, invoker) = setup();
    invoker.start(request(json!({
        "kind": "process",
        "cmd": "true",
        "sink": {"type": "panel", "name": "out"}
    })));

    assert_eq!(host.show_count("output.out"), 1);
    host.last_process().unwrap().finish(ExitStatus::Code(0));
    assert_eq!(host.hide_count("output.out"), 1);
}

#[test]
fn output_split_across_chunks_is_buffered_by_line() {
    let (host, invoker) = setup();
    invoker.start(request(json!({
        "kind": "process",
        "cmd": "make",
        "sink": {"type": "panel", "name": "build"}
    })));

    let process = host.last_process().unwrap();
    process.emit(b"a\n");
    process.emit(b"b\r\n");
    process.emit(b"c");
    process.finish(ExitStatus::Code(0));

    assert_eq!(host.panel("build").unwrap().contents(), "a\nb\nc");
}

#[test]
fn mixed_sequence_runs_in_order() {
    let (host, invoker) = setup();
    invoker.start(request(json!({
        "steps": [
            {"kind": "command", "command": "save_all"},
            {"kind": "process", "cmd": "make"},
            {"type": "sublime", "commandName": "show_overlay", "args": {"overlay": "goto"}},
            {"kind": "exec", "cmd": ["./run", "--fast"]},
            {"kind": "command", "command": "done"}
        ]
    })));

    assert_eq!(host.commands(), vec!["save_all"]);
    assert_eq!(invoker.cursor(), Some(1));

    host.process(0).unwrap().finish(ExitStatus::Code(0));
    assert_eq!(host.commands(), vec!["save_all", "show_overlay"]);
    assert_eq!(invoker.cursor(), Some(3));
    assert_eq!(host.process(1).unwrap().request.command.to_string(), "./run --fast");

    host.process(1).unwrap().finish(ExitStatus::Unknown);
    assert_eq!(host.commands(), vec!["save_all", "show_overlay", "done"]);
    assert!(!invoker.is_running());
    assert_eq!(invoker.last_outcome(), Some(RunStatus::Finished));
}

#[test]
fn legacy_actions_key_is_accepted() {
    let (host, invoker) = setup();
    invoker.start(request(json!({
        "actions": [{"kind": "command", "command": "one"}, {"kind": "command", "command": "two"}]
    })));
    assert_eq!(host.commands(), vec!["one", "two"]);
}

#[test]
fn abort_writes_aborted_line_and_finishes_sink() {
    let (host, invoker) = setup();
    invoker.start(request(json!({
        "kind": "process",
        "cmd": "make",
        "sink": {"type": "panel", "name": "out", "show": false, "hide": true}
    })));
    host.last_process().unwrap().emit(b"compiling\n");

    assert_eq!(invoker.abort(), RunStatus::Aborted);
    assert_eq!(host.last_process().unwrap().kill_count(), 1);
    assert_eq!(host.panel("out").unwrap().contents(), "compiling\nAborted.");
    assert_eq!(host.hide_count("output.out"), 1);
    assert_eq!(host.show_count("output.out"), 0);
    assert_eq!(host.last_status().as_deref(), Some("Aborted"));

    assert_eq!(invoker.abort(), RunStatus::NothingToStop);
}

#[test]
fn nonzero_exit_keeps_output_and_terminates() {
    let (host, invoker) = setup();
    invoker.start(request(json!({
        "steps": [
            {"kind": "process", "cmd": "make", "sink": {"type": "panel", "name": "out"}},
            {"kind": "command", "command": "never"}
        ]
    })));
    let process = host.last_process().unwrap();
    process.emit(b"error: boom\n");
    process.finish(ExitStatus::Code(2));

    assert!(host.commands().is_empty());
    assert_eq!(host.panel("out").unwrap().contents(), "error: boom");
    assert_eq!(host.hide_count("output.out"), 0);
    assert_eq!(invoker.last_outcome(), Some(RunStatus::Terminated));
}

#[test]
fn invalid_sink_fails_without_spawning() {
    let (host, invoker) = setup();
    invoker.start(request(json!({
        "kind": "process",
        "cmd": "make",
        "sink": {"type": "panel", "name": "out", "hide": "sometimes"}
    })));

    assert_eq!(host.spawn_count(), 0);
    assert_eq!(host.panels_created(), 0);
    assert_eq!(invoker.last_outcome(), Some(RunStatus::Failed));
    assert!(host.errors()[0].contains("sink.hide"));
    assert!(!invoker.is_running());
}

#[test]
fn reused_panel_is_cleared() {
    let host = Arc::new(
        MockHost::new()
            .with_document("/tmp/project/main.c")
            .with_panel("out", "old output"),
    );
    let invoker = Invoker::new(host.clone());
    invoker.start(request(json!({
        "kind": "process",
        "cmd": "make",
        "sink": {"type": "panel", "name": "out", "word_wrap": false}
    })));

    let panel = host.panel("out").unwrap();
    assert_eq!(host.panels_created(), 0);
    assert_eq!(panel.clear_count(), 1);
    assert!(panel.is_read_only());
    assert_eq!(panel.setting("word_wrap"), Some(json!(false)));
}

#[test]
fn variables_expand_in_command_line() {
    let host = Arc::new(
        MockHost::new()
            .with_document("/tmp/project/main.c")
            .with_variable("file_base_name", "main"),
    );
    let invoker = Invoker::new(host.clone());
    invoker.start(request(json!({
        "kind": "process",
        "cmd": "cc -o ${file_base_name} ${missing:fallback}.c",
        "env": {"TARGET": "$file_base_name"}
    })));

    let spawned = host.last_process().unwrap().request;
    assert_eq!(spawned.command.to_string(), "cc -o main fallback.c");
    assert_eq!(spawned.env["TARGET"], "main");
}

#[test]
fn restart_after_finish() {
    let (host, invoker) = setup();
    invoker.start(StepSpec::command("first", None));
    assert_eq!(invoker.start(StepSpec::command("second", None)), RunStatus::Started);
    assert_eq!(host.commands(), vec!["first", "second"]);
    assert_eq!(
        host.statuses(),
        vec!["Started", "Finished", "Started", "Finished"]
    );
}

#[test]
fn context_query_tracks_running_state() {
    let (host, invoker) = setup();
    invoker.start(StepSpec::process("make"));
    assert_eq!(
        invoker.query_context(RUNNING_CONTEXT_KEY, ContextOperator::Equal, true),
        Some(true)
    );

    host.last_process().unwrap().finish(ExitStatus::Code(0));
    assert_eq!(
        invoker.query_context(RUNNING_CONTEXT_KEY, ContextOperator::Equal, true),
        Some(false)
    );
    assert_eq!(
        invoker.query_context(RUNNING_CONTEXT_KEY, ContextOperator::NotEqual, true),
        Some(true)
    );
}

#[test]
fn host_sees_started_before_any_step() {
    let (host, invoker) = setup();
    invoker.start(StepSpec::command("go", None));
    let events = host.events();
    assert_eq!(events[0], HostEvent::Status("Started".into()));
    assert!(matches!(events[1], HostEvent::Command { .. }));
}
