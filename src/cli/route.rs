//! CLI route: single route table and run context. Dispatches to the pipelines and presentation.

use crate::cli::parse::Commands;
use crate::cli::presentation::{
    format_bundle_reports_json, format_bundle_reports_text, format_generation_report_json,
    format_generation_report_text, OutputFormat,
};
use crate::config::{ConfettiConfig, ConfigLoader, ResolvedPaths};
use crate::error::PipelineError;
use crate::overrides::Selector;
use crate::render::ConfigRenderer;
use crate::runtime::{MaterializeRequest, Materializer};
use crate::store;
use crate::tokens;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// Runtime context for CLI execution: workspace, loaded config and resolved roots.
/// Built from workspace path and optional config path using ConfigLoader only.
pub struct RunContext {
    workspace_root: PathBuf,
    config: ConfettiConfig,
    paths: ResolvedPaths,
}

impl RunContext {
    /// Create run context from workspace root and optional config path.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, PipelineError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };

        config.validate().map_err(|errors| {
            PipelineError::ConfigError(
                errors
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        })?;

        let paths = config.paths.resolve(&workspace_root);
        Ok(Self {
            workspace_root,
            config,
            paths,
        })
    }

    pub fn config(&self) -> &ConfettiConfig {
        &self.config
    }

    /// Execute a command and return its summary.
    pub fn execute(&self, command: &Commands) -> Result<String, PipelineError> {
        let started = Instant::now();
        let result = match command {
            Commands::Generate { format, args } => self.handle_generate(args, format.parse()?),
            Commands::Materialize { format, args } => {
                self.handle_materialize(args, format.parse()?)
            }
        };
        info!(
            command = command.name(),
            ok = result.is_ok(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        result
    }

    fn handle_generate(&self, args: &[String], format: OutputFormat) -> Result<String, PipelineError> {
        let pairs = tokens::parse_key_values(args);
        let env = tokens::last_value(&pairs, "env").ok_or_else(|| {
            PipelineError::Validation(
                "Usage: confetti generate env=<prod|experiment|test|all> [exp=<name|all>]"
                    .to_string(),
            )
        })?;
        let selector = Selector::validate(env, tokens::last_value(&pairs, "exp"))?;

        let renderer = ConfigRenderer::discover(self.paths.clone())?;
        let report = renderer.generate_all(&selector)?;
        Ok(match format {
            OutputFormat::Text => format_generation_report_text(&report),
            OutputFormat::Json => format_generation_report_json(&report),
        })
    }

    fn handle_materialize(
        &self,
        args: &[String],
        format: OutputFormat,
    ) -> Result<String, PipelineError> {
        let request = MaterializeRequest::from_tokens(args)?;
        let store = store::from_config(&self.config.store, &self.workspace_root)?;
        let materializer = Materializer::new(&self.paths, &self.config.artifacts, store.as_ref());
        let reports = materializer.run(&request)?;
        Ok(match format {
            OutputFormat::Text => format_bundle_reports_text(&reports),
            OutputFormat::Json => format_bundle_reports_json(&reports),
        })
    }
}
