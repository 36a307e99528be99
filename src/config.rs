//! Configuration System
//!
//! Layered configuration for the generation pipelines: filesystem roots, artifact
//! conventions used by runtime materialization, object store backend and logging.

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::workspace_file::WORKSPACE_CONFIG_FILE;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfettiConfig {
    /// Filesystem roots for templates, overrides and outputs
    #[serde(default)]
    pub paths: PathsConfig,

    /// Artifact location conventions
    #[serde(default)]
    pub artifacts: ArtifactsConfig,

    /// Remote object store
    #[serde(default)]
    pub store: StoreConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Filesystem layout, relative paths resolve against the workspace root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_template_root")]
    pub template_root: PathBuf,
    #[serde(default = "default_override_root")]
    pub override_root: PathBuf,
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,
    #[serde(default = "default_runtime_root")]
    pub runtime_root: PathBuf,
    /// Extension (without dot) of template files
    #[serde(default = "default_template_extension")]
    pub template_extension: String,
}

fn default_template_root() -> PathBuf {
    PathBuf::from("config-templates")
}

fn default_override_root() -> PathBuf {
    PathBuf::from("config-overrides")
}

fn default_output_root() -> PathBuf {
    PathBuf::from("configs")
}

fn default_runtime_root() -> PathBuf {
    PathBuf::from("runtime-configs")
}

fn default_template_extension() -> String {
    "j2".to_string()
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            template_root: default_template_root(),
            override_root: default_override_root(),
            output_root: default_output_root(),
            runtime_root: default_runtime_root(),
            template_extension: default_template_extension(),
        }
    }
}

/// Absolute filesystem roots for one workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub template_root: PathBuf,
    pub override_root: PathBuf,
    pub output_root: PathBuf,
    pub runtime_root: PathBuf,
    pub template_extension: String,
}

impl PathsConfig {
    /// Resolve every root against `workspace_root` (absolute roots are kept as-is).
    pub fn resolve(&self, workspace_root: &Path) -> ResolvedPaths {
        ResolvedPaths {
            template_root: workspace_root.join(&self.template_root),
            override_root: workspace_root.join(&self.override_root),
            output_root: workspace_root.join(&self.output_root),
            runtime_root: workspace_root.join(&self.runtime_root),
            template_extension: self.template_extension.trim_start_matches('.').to_string(),
        }
    }
}

impl ResolvedPaths {
    /// All four roots under a single base directory, using the default directory names.
    pub fn under(base: &Path) -> Self {
        PathsConfig::default().resolve(base)
    }
}

/// Where jars live and where runtime bundles are published
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactsConfig {
    /// Root URI of the jar repository
    #[serde(default = "default_jar_root")]
    pub jar_root: String,
    /// Branch whose jars are published as snapshots
    #[serde(default = "default_main_branch")]
    pub main_branch: String,
    /// File that carries the jar reference and must exist in every bundle
    #[serde(default = "default_identity_file")]
    pub identity_file: String,
    /// Remote prefix under which runtime bundles are mirrored
    #[serde(default = "default_publish_prefix")]
    pub publish_prefix: String,
}

fn default_jar_root() -> String {
    "s3://thetradedesk-mlplatform-us-east-1/libs/audience/jars".to_string()
}

fn default_main_branch() -> String {
    "master".to_string()
}

fn default_identity_file() -> String {
    "identity_config.yml".to_string()
}

fn default_publish_prefix() -> String {
    "s3://thetradedesk-mlplatform-us-east-1/configdata/confetti/runtime-configs".to_string()
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            jar_root: default_jar_root(),
            main_branch: default_main_branch(),
            identity_file: default_identity_file(),
            publish_prefix: default_publish_prefix(),
        }
    }
}

/// Object store backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Objects mirrored into a local directory (`{root}/{bucket}/{key}`)
    Fs,
    /// Objects read and written over HTTP (`{endpoint}/{bucket}/{key}`)
    Http,
}

/// Object store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,
    /// Mirror directory for the fs backend
    #[serde(default = "default_store_root")]
    pub root: PathBuf,
    /// Base URL for the http backend
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Request timeout; unbounded when unset
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_backend() -> StoreBackend {
    StoreBackend::Fs
}

fn default_store_root() -> PathBuf {
    PathBuf::from(".confetti/object-store")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            root: default_store_root(),
            endpoint: None,
            timeout_secs: None,
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ConfigValidationError {
    Paths(String),
    Artifacts(String),
    Store(String),
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigValidationError::Paths(msg) => write!(f, "Paths: {}", msg),
            ConfigValidationError::Artifacts(msg) => write!(f, "Artifacts: {}", msg),
            ConfigValidationError::Store(msg) => write!(f, "Store: {}", msg),
        }
    }
}

impl std::error::Error for ConfigValidationError {}

impl ConfettiConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ConfigValidationError>> {
        let mut errors = Vec::new();

        for (name, path) in [
            ("template_root", &self.paths.template_root),
            ("override_root", &self.paths.override_root),
            ("output_root", &self.paths.output_root),
            ("runtime_root", &self.paths.runtime_root),
        ] {
            if path.as_os_str().is_empty() {
                errors.push(ConfigValidationError::Paths(format!("{} cannot be empty", name)));
            }
        }
        if self.paths.template_extension.trim_start_matches('.').is_empty() {
            errors.push(ConfigValidationError::Paths(
                "template_extension cannot be empty".to_string(),
            ));
        }

        for (name, uri) in [
            ("jar_root", &self.artifacts.jar_root),
            ("publish_prefix", &self.artifacts.publish_prefix),
        ] {
            if !uri.contains("://") {
                errors.push(ConfigValidationError::Artifacts(format!(
                    "{} must be a URI with a scheme, got '{}'",
                    name, uri
                )));
            }
        }
        if self.artifacts.main_branch.is_empty() {
            errors.push(ConfigValidationError::Artifacts(
                "main_branch cannot be empty".to_string(),
            ));
        }
        if self.artifacts.identity_file.is_empty() {
            errors.push(ConfigValidationError::Artifacts(
                "identity_file cannot be empty".to_string(),
            ));
        }

        match self.store.backend {
            StoreBackend::Fs if self.store.root.as_os_str().is_empty() => {
                errors.push(ConfigValidationError::Store(
                    "root is required for the fs backend".to_string(),
                ));
            }
            StoreBackend::Http => match &self.store.endpoint {
                None => errors.push(ConfigValidationError::Store(
                    "endpoint is required for the http backend".to_string(),
                )),
                Some(endpoint)
                    if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") =>
                {
                    errors.push(ConfigValidationError::Store(format!(
                        "endpoint must be an http(s) URL, got '{}'",
                        endpoint
                    )));
                }
                Some(_) => {}
            },
            StoreBackend::Fs => {}
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
