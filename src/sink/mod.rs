//! Output sinks for process steps.
//!
//! - [`Sink`] - a destination that can be written, shown and hidden
//! - [`PanelSink`] - a host panel with cross-chunk line buffering
//! - [`VisibilityPolicy`] - decides when a sink is shown or hidden
//!
//! # Example
//!
//! ```
//! use invoker::host::MockHost;
//! use invoker::sink::{HideTrigger, PanelSink, ShowTrigger, VisibilityPolicy};
//! use std::sync::Arc;
//!
//! let host = Arc::new(MockHost::new());
//! let sink = PanelSink::new(host.clone(), "out", &Default::default());
//! let mut policy = VisibilityPolicy::new(
//!     Box::new(sink),
//!     ShowTrigger::OnFirstWrite,
//!     HideTrigger::IfNeverWrittenNonEmpty,
//! );
//!
//! assert_eq!(host.show_count("output.out"), 0);
//! policy.write("hi\n");
//! assert_eq!(host.show_count("output.out"), 1);
//! policy.finish();
//! assert_eq!(host.hide_count("output.out"), 0);
//! ```

pub mod panel;
pub mod policy;

pub use panel::PanelSink;
pub use policy::{HideTrigger, ShowTrigger, VisibilityPolicy};

use crate::config::SinkConfig;
use crate::error::{InvokerError, Result};
use crate::host::Host;
use std::sync::Arc;

/// A textual output destination.
pub trait Sink: Send {
    /// Write text.
    fn write(&mut self, text: &str);

    /// Make the destination visible.
    fn show(&mut self);

    /// Hide the destination.
    fn hide(&mut self);
}

/// Validate a sink configuration without touching the host.
pub fn check_sink(config: &SinkConfig) -> Result<(ShowTrigger, HideTrigger)> {
    if config.sink_type != "panel" {
        return Err(InvokerError::config(
            r#"Only "panel" sink type is supported for now."#,
        ));
    }
    let show = ShowTrigger::from_value(&config.show)?;
    let hide = HideTrigger::from_value(&config.hide)?;
    Ok((show, hide))
}

/// Build a sink and its visibility policy from configuration.
///
/// Every value is validated before the panel is created, so an invalid
/// configuration leaves the host untouched.
pub fn build_sink(host: Arc<dyn Host>, config: &SinkConfig) -> Result<VisibilityPolicy> {
    let (show, hide) = check_sink(config)?;
    let sink = PanelSink::new(host, &config.name, &config.settings);
    Ok(VisibilityPolicy::new(Box::new(sink), show, hide))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MockHost;
    use serde_json::{json, Map};

    fn config(value: serde_json::Value) -> SinkConfig {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn build_sink_creates_panel_and_shows_by_default() {
        let host = Arc::new(MockHost::new());
        let cfg = config(json!({"type": "panel", "name": "build"}));

        let policy = build_sink(host.clone(), &cfg).unwrap();
        assert_eq!(policy.show_trigger(), ShowTrigger::AtConstruction);
        assert_eq!(policy.hide_trigger(), HideTrigger::IfNeverWrittenNonEmpty);
        assert_eq!(host.panels_created(), 1);
        assert_eq!(host.show_count("output.build"), 1);
    }

    #[test]
    fn unsupported_type_is_rejected_before_panel_creation() {
        let host = Arc::new(MockHost::new());
        let cfg = SinkConfig {
            sink_type: "view".to_string(),
            name: "x".to_string(),
            show: json!(true),
            hide: json!(true),
            settings: Map::new(),
        };

        let Err(err) = build_sink(host.clone(), &cfg) else {
            panic!("unsupported sink type was accepted");
        };
        assert!(matches!(err, InvokerError::Configuration { .. }));
        assert_eq!(host.panels_created(), 0);
    }

    #[test]
    fn invalid_show_is_rejected_before_panel_creation() {
        let host = Arc::new(MockHost::new());
        let cfg = config(json!({"type": "panel", "name": "x", "show": "sometimes"}));

        let Err(err) = build_sink(host.clone(), &cfg) else {
            panic!("invalid show value was accepted");
        };
        assert!(err.to_string().contains("sink.show"));
        assert_eq!(host.panels_created(), 0);
        assert!(host.events().is_empty());
    }

    #[test]
    fn invalid_hide_is_rejected_before_panel_creation() {
        let host = Arc::new(MockHost::new());
        let cfg = config(json!({"type": "panel", "name": "x", "hide": 1}));

        let Err(err) = build_sink(host.clone(), &cfg) else {
            panic!("invalid hide value was accepted");
        };
        assert!(err.to_string().contains("sink.hide"));
        assert_eq!(host.panels_created(), 0);
    }

    #[test]
    fn check_sink_reports_triggers() {
        let cfg = config(json!({"type": "panel", "name": "x", "show": "on_write", "hide": false}));
        let (show, hide) = check_sink(&cfg).unwrap();
        assert_eq!(show, ShowTrigger::OnFirstWrite);
        assert_eq!(hide, HideTrigger::Never);
    }

    #[test]
    fn built_policy_is_debuggable() {
        let host = Arc::new(MockHost::new());
        let cfg = config(json!({"type": "panel", "name": "x", "show": false}));
        let policy = build_sink(host, &cfg).unwrap();
        assert!(format!("{:?}", policy).contains("Never"));
    }
}
