//! Run request configuration.
//!
//! - Schema definitions in [`schema`]
//! - File loading in [`loader`]
//! - Variable expansion in [`interpolation`]
//!
//! # Example
//!
//! ```
//! use invoker::config::{RunRequest, StepKind};
//!
//! let request: RunRequest = serde_json::from_str(
//!     r#"{"steps": [{"kind": "command", "command": "save"}]}"#,
//! ).unwrap();
//! let steps = request.into_steps();
//! assert_eq!(steps[0].step_kind().unwrap(), StepKind::Command);
//! ```

pub mod interpolation;
pub mod loader;
pub mod schema;

pub use interpolation::{expand_variables, parse_interpolation, Segment};
pub use loader::{load_request, parse_request, RequestFormat};
pub use schema::{
    CommandLine, CommandParams, ProcessOptions, ProcessParams, RunRequest, SinkConfig, StepKind,
    StepSpec,
};
