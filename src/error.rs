//! Error types for the confetti generation pipelines.

use std::path::PathBuf;
use thiserror::Error;

/// Object store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid object URI: {0}")]
    InvalidUri(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Object store request failed: {0}")]
    RequestFailed(String),

    #[error("Object store I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Pipeline errors shared by static generation and runtime materialization
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Validation(String),

    #[error("Discovery failed: {0}")]
    Discovery(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Render failed for {location}: {message}")]
    Render { location: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Object store upload failed for files: {}", .failed.join(", "))]
    Publish { failed: Vec<String> },

    #[error("Materialization failed for jobs: {}", .failed.join(", "))]
    JobsFailed { failed: Vec<String> },

    #[error("Object store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid YAML in {path:?}: {message}")]
    Yaml { path: PathBuf, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<config::ConfigError> for PipelineError {
    fn from(err: config::ConfigError) -> Self {
        PipelineError::ConfigError(err.to_string())
    }
}

impl PipelineError {
    /// I/O failure annotated with the path it touched.
    pub fn io_at(path: &std::path::Path, err: std::io::Error) -> Self {
        PipelineError::Io(std::io::Error::new(
            err.kind(),
            format!("{}: {}", path.display(), err),
        ))
    }
}
