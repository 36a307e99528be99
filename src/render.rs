//! Static config generation: templates layered with environment overrides and variants.
//!
//! For each environment path, group, job and variant, every job template is rendered
//! against the job's override document and written as deterministic YAML under the
//! output root. Render failures are recorded per output file and never stop the run.

use crate::catalog::{JobTemplate, TemplateCatalog};
use crate::config::ResolvedPaths;
use crate::engine;
use crate::error::PipelineError;
use crate::overrides::{self, EnvironmentPath, Selector, ALL};
use crate::variants::{self, VariantDefaults};
use crate::yaml::{self, KeyOrder};
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Per-job override file name.
pub const OVERRIDE_FILE: &str = "config.yml";

/// Override key holding the variant overlay list.
pub const VARIANTS_KEY: &str = "variants";
/// Bookkeeping key stripped from every rendered document.
pub const JOB_NAME_KEY: &str = "job_name";
pub const VARIANT_KEY: &str = "variant";

pub const ENVIRONMENT_KEY: &str = "environment";
pub const EXPERIMENT_KEY: &str = "experimentName";
pub const DATA_NAMESPACE_KEY: &str = "data_namespace";

/// One output file that could not be produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderFailure {
    /// `{env_path}/{group}/{job}[/{variant}]/{filename}`
    pub location: String,
    pub message: String,
    /// Variables the template needed but the context lacked
    pub missing: Vec<String>,
}

/// Files written and recoverable failures of a generation call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    pub written: Vec<PathBuf>,
    pub failures: Vec<RenderFailure>,
}

impl GenerationReport {
    pub fn absorb(&mut self, other: GenerationReport) {
        self.written.extend(other.written);
        self.failures.extend(other.failures);
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Renders job templates against override documents.
pub struct ConfigRenderer {
    paths: ResolvedPaths,
    catalog: TemplateCatalog,
    defaults: Arc<VariantDefaults>,
}

impl ConfigRenderer {
    pub fn new(paths: ResolvedPaths, catalog: TemplateCatalog, defaults: Arc<VariantDefaults>) -> Self {
        Self {
            paths,
            catalog,
            defaults,
        }
    }

    /// Discover the template catalog under the configured template root.
    pub fn discover(paths: ResolvedPaths) -> Result<Self, PipelineError> {
        let catalog = TemplateCatalog::discover(&paths.template_root, &paths.template_extension)?;
        info!(
            root = %paths.template_root.display(),
            templates = catalog.len(),
            "Loaded templates"
        );
        Ok(Self::new(paths, catalog, Arc::new(VariantDefaults::new())))
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    pub fn paths(&self) -> &ResolvedPaths {
        &self.paths
    }

    fn override_path(&self, env_path: &EnvironmentPath, group: &str, job: &str) -> PathBuf {
        self.paths
            .override_root
            .join(env_path.to_string())
            .join(group)
            .join(job)
            .join(OVERRIDE_FILE)
    }

    /// Load the job's override document; missing, empty and null documents are empty.
    fn load_override(&self, path: &Path) -> Result<Mapping, PipelineError> {
        if !path.is_file() {
            warn!(path = %path.display(), "No override config found; using defaults");
            return Ok(Mapping::new());
        }
        let text = fs::read_to_string(path).map_err(|e| PipelineError::io_at(path, e))?;
        let parsed: Value = serde_yaml::from_str(&text).map_err(|e| PipelineError::Yaml {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        match parsed {
            Value::Null => Ok(Mapping::new()),
            Value::Mapping(map) => Ok(map),
            _ => Err(PipelineError::Yaml {
                path: path.to_path_buf(),
                message: "override document must be a mapping".to_string(),
            }),
        }
    }

    /// Render one template for every merged variant of its job.
    pub fn render_job(
        &self,
        env_path: &EnvironmentPath,
        group: &str,
        template: &JobTemplate,
    ) -> Result<GenerationReport, PipelineError> {
        let override_path = self.override_path(env_path, group, &template.job);
        let mut context = self.load_override(&override_path)?;
        let override_variants = context.remove(VARIANTS_KEY);
        apply_base_defaults(&mut context, env_path);

        let defaults = self
            .defaults
            .load(&self.paths.template_root, group, &template.job);
        let merged = variants::merge(&defaults, override_variants.as_ref());

        let job_dir = self
            .paths
            .output_root
            .join(env_path.to_string())
            .join(group)
            .join(&template.job);

        let mut report = GenerationReport::default();
        if merged.is_empty() {
            let location = format!("{}/{}/{}/{}", env_path, group, template.job, template.filename);
            let mut pass = context.clone();
            pass.insert(Value::from(VARIANT_KEY), Value::Null);
            self.render_pass(&pass, template, &job_dir, location, &override_path, &mut report)?;
            return Ok(report);
        }

        for variant in &merged {
            let location = format!(
                "{}/{}/{}/{}/{}",
                env_path, group, template.job, variant.name, template.filename
            );
            let mut pass = context.clone();
            for (key, value) in &variant.fields {
                pass.insert(key.clone(), value.clone());
            }
            pass.insert(Value::from(VARIANT_KEY), Value::from(variant.name.clone()));
            let out_dir = job_dir.join(&variant.name);
            self.render_pass(&pass, template, &out_dir, location, &override_path, &mut report)?;
        }
        Ok(report)
    }

    /// Render and write one file; render and re-parse errors land in the report.
    fn render_pass(
        &self,
        context: &Mapping,
        template: &JobTemplate,
        out_dir: &Path,
        location: String,
        override_path: &Path,
        report: &mut GenerationReport,
    ) -> Result<(), PipelineError> {
        let compiled = self.catalog.get(&template.name)?;
        let rendered = match compiled.render(minijinja::Value::from_serialize(context)) {
            Ok(text) => text,
            Err(err) => {
                let missing = if engine::is_undefined_error(&err) {
                    let provided: BTreeSet<String> = context
                        .keys()
                        .filter_map(|key| key.as_str().map(str::to_string))
                        .collect();
                    engine::missing_variables(
                        compiled.undeclared_variables(false),
                        &provided,
                        &err,
                        compiled.source(),
                    )
                } else {
                    Vec::new()
                };
                if missing.is_empty() {
                    error!("Error generating {}: {}", location, err);
                } else {
                    for key in &missing {
                        error!(
                            "Error generating {}: configuration '{}' is required but no value was provided in {}",
                            location,
                            key,
                            override_path.display()
                        );
                    }
                }
                report.failures.push(RenderFailure {
                    location,
                    message: err.to_string(),
                    missing,
                });
                return Ok(());
            }
        };

        let document = match serde_yaml::from_str::<Value>(&rendered) {
            Ok(Value::Null) => Value::Mapping(Mapping::new()),
            Ok(Value::Mapping(mut map)) => {
                map.remove(JOB_NAME_KEY);
                Value::Mapping(map)
            }
            Ok(other) => other,
            Err(err) => {
                error!("Error generating {}: rendered output is not valid YAML: {}", location, err);
                report.failures.push(RenderFailure {
                    location,
                    message: err.to_string(),
                    missing: Vec::new(),
                });
                return Ok(());
            }
        };

        fs::create_dir_all(out_dir).map_err(|e| PipelineError::io_at(out_dir, e))?;
        let out_path = out_dir.join(&template.filename);
        fs::write(&out_path, yaml::to_string(&document, KeyOrder::Insertion))
            .map_err(|e| PipelineError::io_at(&out_path, e))?;
        info!("Wrote {}", out_path.display());
        report.written.push(out_path);
        Ok(())
    }

    /// Every job template of `group` for one environment path.
    pub fn generate_group(
        &self,
        env_path: &EnvironmentPath,
        group: &str,
    ) -> Result<GenerationReport, PipelineError> {
        let templates = self.catalog.jobs_for_group(group);
        if templates.is_empty() {
            warn!(env = %env_path, group, "No templates found for group");
        }
        let mut report = GenerationReport::default();
        for template in &templates {
            report.absorb(self.render_job(env_path, group, template)?);
        }
        Ok(report)
    }

    /// Every group present under one environment path.
    pub fn generate_env(&self, env_path: &EnvironmentPath) -> Result<GenerationReport, PipelineError> {
        let groups = overrides::list_groups(&self.paths.override_root, env_path)?;
        debug!(env = %env_path, groups = groups.len(), "Generating environment");
        let mut report = GenerationReport::default();
        for group in &groups {
            report.absorb(self.generate_group(env_path, group)?);
        }
        Ok(report)
    }

    /// Every environment path the selector matches.
    pub fn generate_all(&self, selector: &Selector) -> Result<GenerationReport, PipelineError> {
        let env_paths: Vec<EnvironmentPath> =
            overrides::list_environment_paths(&self.paths.override_root)?
                .into_iter()
                .filter(|path| selector.matches_env(path))
                .collect();
        if selector.env() != ALL && env_paths.is_empty() {
            return Err(PipelineError::Discovery(format!(
                "Environment '{}' not found",
                selector.env()
            )));
        }

        let selected: Vec<&EnvironmentPath> =
            env_paths.iter().filter(|path| selector.matches(path)).collect();
        if selector.experiment() != ALL && selected.is_empty() {
            warn!(
                env = selector.env(),
                exp = selector.experiment(),
                "No experiment matched the selector"
            );
        }

        let mut report = GenerationReport::default();
        for env_path in selected {
            report.absorb(self.generate_env(env_path)?);
        }
        info!(
            written = report.written.len(),
            failed = report.failures.len(),
            "Generation finished"
        );
        Ok(report)
    }
}

/// Base fields set only when the override does not provide them.
fn apply_base_defaults(context: &mut Mapping, env_path: &EnvironmentPath) {
    let env_key = Value::from(ENVIRONMENT_KEY);
    if !context.contains_key(&env_key) {
        context.insert(env_key, Value::from(env_path.env()));
    }

    let exp_key = Value::from(EXPERIMENT_KEY);
    match env_path.experiment() {
        Some(exp) => {
            if !context.contains_key(&exp_key) {
                context.insert(exp_key, Value::from(exp));
            }
        }
        None => {
            context.remove(&exp_key);
        }
    }

    let ns_key = Value::from(DATA_NAMESPACE_KEY);
    if !context.contains_key(&ns_key) {
        context.insert(ns_key, Value::from(env_path.data_namespace()));
    }
}
