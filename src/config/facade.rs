//! Config facade: the single entry point that assembles sources in precedence order.

use super::merge::merge_policy;
use super::sources::{global_file, workspace_file};
use super::ConfettiConfig;
use crate::error::PipelineError;
use config::{Environment, File};
use std::path::Path;

/// Loads [`ConfettiConfig`] from defaults, config files and `CONFETTI__*` environment variables.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace.
    ///
    /// Precedence (lowest to highest): defaults, global file, `{workspace}/confetti.toml`,
    /// environment variables such as `CONFETTI__PATHS__OUTPUT_ROOT`.
    pub fn load(workspace_root: &Path) -> Result<ConfettiConfig, PipelineError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let config = builder.add_source(env_source()).build()?;
        Ok(config.try_deserialize()?)
    }

    /// Load configuration from an explicit file, skipping global and workspace discovery.
    pub fn load_from_file(path: &Path) -> Result<ConfettiConfig, PipelineError> {
        if !path.exists() {
            return Err(PipelineError::ConfigError(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let config = merge_policy::builder_with_defaults()?
            .add_source(File::from(path.to_path_buf()))
            .add_source(env_source())
            .build()?;
        Ok(config.try_deserialize()?)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("CONFETTI")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}
