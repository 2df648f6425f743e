//! Run request loading.
//!
//! Requests are read from YAML (`.yml`/`.yaml`) or JSON files. Step
//! parameters are not validated here; see [`crate::runner::Sequence`].

use crate::config::schema::RunRequest;
use crate::error::{InvokerError, Result};
use std::fs;
use std::path::Path;

/// Serialization format of a request file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestFormat {
    Yaml,
    Json,
}

impl RequestFormat {
    /// Pick the format from the file extension (JSON unless `.yml`/`.yaml`).
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yml") | Some("yaml") => RequestFormat::Yaml,
            _ => RequestFormat::Json,
        }
    }
}

/// Load a run request from a file.
///
/// # Errors
///
/// Returns `RequestNotFound` if the file doesn't exist.
/// Returns `RequestParse` if the content is invalid.
pub fn load_request(path: &Path) -> Result<RunRequest> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            InvokerError::RequestNotFound {
                path: path.to_path_buf(),
            }
        } else {
            InvokerError::Io(e)
        }
    })?;

    parse_request(&content, RequestFormat::from_path(path), path)
}

/// Parse request content.
///
/// # Arguments
///
/// * `content` - The file content
/// * `format` - YAML or JSON
/// * `source_path` - Path for error reporting
pub fn parse_request(content: &str, format: RequestFormat, source_path: &Path) -> Result<RunRequest> {
    let parsed = match format {
        RequestFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
        RequestFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
    };

    parsed.map_err(|message| InvokerError::RequestParse {
        path: source_path.to_path_buf(),
        message,
    })
}
