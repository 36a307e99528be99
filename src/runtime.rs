//! Runtime materialization: static configs re-rendered against execution-time arguments.
//!
//! A materialized job becomes a content-addressed bundle written under the runtime root
//! and mirrored to the object store.

use crate::artifact::{self, JarResolver};
use crate::bundle::RuntimeBundle;
use crate::config::{ArtifactsConfig, ResolvedPaths};
use crate::engine;
use crate::error::PipelineError;
use crate::overrides::{self, Env, EnvironmentPath};
use crate::placeholder::RunDate;
use crate::store::ObjectStore;
use crate::tokens;
use crate::variants;
use minijinja::Environment;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, error, info};

/// Group used when the request does not name one.
pub const DEFAULT_GROUP: &str = "audience";
/// Argument parsed into a calendar date.
pub const RUN_DATE_KEY: &str = "run_date";
/// Request keys that select what to materialize instead of becoming template variables.
pub const RESERVED_KEYS: [&str; 5] = ["env", "exp", "group", "job", "variant"];

const CONFIG_EXTENSIONS: [&str; 2] = ["yml", "yaml"];

/// Template variables supplied at execution time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuntimeArgs {
    pub values: BTreeMap<String, serde_yaml::Value>,
    pub run_date: Option<RunDate>,
}

impl RuntimeArgs {
    /// Scalar-parse every value; `run_date` must be an eight digit `YYYYMMDD` token.
    pub fn from_pairs<'a>(
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, PipelineError> {
        let mut args = Self::default();
        for (key, raw) in pairs {
            if key == RUN_DATE_KEY {
                let date = RunDate::parse(raw.trim()).ok_or_else(|| {
                    PipelineError::Validation(format!(
                        "run_date must be an 8-digit YYYYMMDD date, got '{}'",
                        raw
                    ))
                })?;
                args.run_date = Some(date);
                continue;
            }
            let value = serde_yaml::from_str::<serde_yaml::Value>(raw)
                .unwrap_or_else(|_| serde_yaml::Value::String(raw.to_string()));
            args.values.insert(key.to_string(), value);
        }
        Ok(args)
    }

    /// Template context: every value plus the parsed run date.
    pub fn context(&self) -> minijinja::Value {
        let mut context: BTreeMap<String, minijinja::Value> = self
            .values
            .iter()
            .map(|(key, value)| (key.clone(), minijinja::Value::from_serialize(value)))
            .collect();
        if let Some(date) = self.run_date {
            context.insert(RUN_DATE_KEY.to_string(), date.value());
        }
        minijinja::Value::from(context)
    }
}

/// A validated `materialize` invocation
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializeRequest {
    pub env_path: EnvironmentPath,
    pub group: String,
    pub job: Option<String>,
    pub variant: Option<String>,
    pub args: RuntimeArgs,
}

impl MaterializeRequest {
    /// Build a request from `key=value` tokens.
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> Result<Self, PipelineError> {
        let pairs = tokens::parse_key_values(tokens);
        let lookup = |key: &str| tokens::last_value(&pairs, key).filter(|v| !v.is_empty());

        let env_name = lookup("env")
            .ok_or_else(|| PipelineError::Validation("env parameter is required".to_string()))?;
        let env = Env::from_str(env_name)?;
        let exp = tokens::last_value(&pairs, "exp");
        let env_path = if env == Env::Prod {
            if exp.is_some() {
                return Err(PipelineError::Validation(
                    "exp parameter must not be provided when env=prod".to_string(),
                ));
            }
            EnvironmentPath::new(env.as_str(), None)?
        } else {
            match exp.filter(|e| !e.is_empty()) {
                Some(exp) => EnvironmentPath::new(env.as_str(), Some(exp))?,
                None => {
                    return Err(PipelineError::Validation(
                        "exp parameter is required for non-prod environments".to_string(),
                    ))
                }
            }
        };

        let variant = lookup("variant").map(str::to_string);
        if let Some(name) = variant.as_deref() {
            if !variants::is_path_segment(name) {
                return Err(PipelineError::Validation(format!(
                    "variant parameter must be a single path segment: {}",
                    name
                )));
            }
        }

        let args = RuntimeArgs::from_pairs(
            pairs
                .iter()
                .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
                .map(|(key, value)| (key.as_str(), value.as_str())),
        )?;

        Ok(Self {
            env_path,
            group: lookup("group").unwrap_or(DEFAULT_GROUP).to_string(),
            job: lookup("job").map(str::to_string),
            variant,
            args,
        })
    }
}

/// Where one materialized bundle landed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleReport {
    pub job: String,
    pub hash_id: String,
    pub local_dir: PathBuf,
    pub remote_prefix: String,
    pub files: Vec<String>,
}

/// Materializes runtime bundles from static output.
pub struct Materializer<'a> {
    paths: &'a ResolvedPaths,
    artifacts: &'a ArtifactsConfig,
    store: &'a dyn ObjectStore,
    engine: Environment<'static>,
}

impl<'a> Materializer<'a> {
    pub fn new(
        paths: &'a ResolvedPaths,
        artifacts: &'a ArtifactsConfig,
        store: &'a dyn ObjectStore,
    ) -> Self {
        Self {
            paths,
            artifacts,
            store,
            engine: engine::strict_environment(),
        }
    }

    fn static_dir(&self, env_path: &EnvironmentPath, group: &str, job: &str, variant: Option<&str>) -> PathBuf {
        let dir = self
            .paths
            .output_root
            .join(env_path.to_string())
            .join(group)
            .join(job);
        match variant {
            Some(variant) => dir.join(variant),
            None => dir,
        }
    }

    /// Materialize one job into a bundle, write it locally and publish it.
    pub fn render_runtime_job(
        &self,
        env_path: &EnvironmentPath,
        group: &str,
        job: &str,
        variant: Option<&str>,
        args: &RuntimeArgs,
    ) -> Result<BundleReport, PipelineError> {
        let job_dir = self.static_dir(env_path, group, job, variant);
        if !job_dir.is_dir() {
            return Err(PipelineError::NotFound(format!(
                "Job directory not found: {}",
                job_dir.display()
            )));
        }

        let filenames = config_files(&job_dir)?;
        let identity_file = self.artifacts.identity_file.as_str();
        if !filenames.iter().any(|name| name == identity_file) {
            return Err(PipelineError::NotFound(format!(
                "{} is required for hashing",
                identity_file
            )));
        }

        let context = args.context();
        let resolver = JarResolver::new(self.artifacts, self.store);
        let mut bundle = RuntimeBundle::new();
        for filename in &filenames {
            let path = job_dir.join(filename);
            let source = fs::read_to_string(&path).map_err(|e| PipelineError::io_at(&path, e))?;
            let rendered = self
                .engine
                .render_str(&source, context.clone())
                .map_err(|e| PipelineError::Render {
                    location: format!("{}/{}/{}/{}", env_path, group, job, filename),
                    message: e.to_string(),
                })?;
            let rendered = if filename == identity_file {
                artifact::inject_jar_path(&rendered, &resolver)?
            } else {
                rendered
            };
            bundle.insert(filename.clone(), rendered);
        }

        let hash_id = bundle.id();
        let local_dir = self
            .paths
            .runtime_root
            .join(env_path.env())
            .join(group)
            .join(job)
            .join(&hash_id);
        bundle.write_local(&local_dir)?;
        debug!(dir = %local_dir.display(), files = bundle.len(), "Wrote runtime bundle");

        let remote_prefix = format!(
            "{}/{}/{}/{}/{}",
            self.artifacts.publish_prefix.trim_end_matches('/'),
            env_path.env(),
            group,
            job,
            hash_id
        );
        bundle.publish(self.store, &remote_prefix)?;

        info!(
            "Generated runtime configs for {}/{}/{} -> {}",
            env_path.env(),
            group,
            job,
            hash_id
        );
        Ok(BundleReport {
            job: job.to_string(),
            hash_id,
            local_dir,
            remote_prefix,
            files: bundle.filenames().map(str::to_string).collect(),
        })
    }

    /// Materialize the requested job, or every job of the group.
    ///
    /// Jobs run independently; the run fails at the end naming every failed job.
    pub fn run(&self, request: &MaterializeRequest) -> Result<Vec<BundleReport>, PipelineError> {
        let base = self
            .paths
            .output_root
            .join(request.env_path.to_string())
            .join(&request.group);
        if !base.is_dir() {
            return Err(PipelineError::NotFound(format!(
                "No configs found under {}",
                base.display()
            )));
        }

        let jobs = match &request.job {
            Some(job) => vec![job.clone()],
            None => overrides::subdirectories(&base)?,
        };

        let mut reports = Vec::with_capacity(jobs.len());
        let mut failed = Vec::new();
        for job in &jobs {
            match self.render_runtime_job(
                &request.env_path,
                &request.group,
                job,
                request.variant.as_deref(),
                &request.args,
            ) {
                Ok(report) => reports.push(report),
                Err(e) => {
                    error!(job = %job, error = %e, "Failed to materialize job");
                    failed.push(job.clone());
                }
            }
        }

        if failed.is_empty() {
            Ok(reports)
        } else {
            Err(PipelineError::JobsFailed { failed })
        }
    }
}

/// Config files directly inside `dir`, sorted by name.
fn config_files(dir: &Path) -> Result<Vec<String>, PipelineError> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| PipelineError::io_at(dir, e))? {
        let entry = entry.map_err(|e| PipelineError::io_at(dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let recognized = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| CONFIG_EXTENSIONS.contains(&ext))
            .unwrap_or(false);
        if recognized {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}
