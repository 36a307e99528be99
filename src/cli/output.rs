//! CLI output: error mapping from pipeline errors to the CLI surface.

use crate::error::PipelineError;

/// Map pipeline errors to the message printed on stderr.
pub fn map_error(e: &PipelineError) -> String {
    match e {
        PipelineError::Validation(message) => message.clone(),
        PipelineError::ConfigError(message) => format!("Configuration error: {}", message),
        other => other.to_string(),
    }
}
