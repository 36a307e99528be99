//! Template catalog: every template under the template root, compiled once.
//!
//! Templates are addressed by their path relative to the root with `/` separators
//! and NFC-normalized names, e.g. `audience/merge/identity_config.yml.j2`.

use crate::engine;
use crate::error::PipelineError;
use minijinja::{Environment, Template};
use std::fs;
use std::path::{Component, Path};
use unicode_normalization::UnicodeNormalization;
use walkdir::WalkDir;

/// A template that renders to one output file of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobTemplate {
    pub job: String,
    /// Output file name, i.e. the template name without its extension
    pub filename: String,
    /// Catalog key
    pub name: String,
}

/// Compiled templates keyed by normalized relative path
pub struct TemplateCatalog {
    env: Environment<'static>,
    names: Vec<String>,
    extension: String,
}

/// Relative path with `/` separators and NFC-normalized components.
pub fn normalize_relative(path: &Path) -> String {
    let parts: Vec<String> = path
        .components()
        .filter_map(|component| match component {
            Component::Normal(name) => Some(name.to_string_lossy().nfc().collect::<String>()),
            _ => None,
        })
        .collect();
    parts.join("/")
}

impl TemplateCatalog {
    /// Discover templates with the static engine.
    pub fn discover(root: &Path, extension: &str) -> Result<Self, PipelineError> {
        Self::discover_with(root, extension, engine::static_environment())
    }

    /// Walk `root` recursively and compile every `*.{extension}` file into `env`.
    pub fn discover_with(
        root: &Path,
        extension: &str,
        mut env: Environment<'static>,
    ) -> Result<Self, PipelineError> {
        if !root.is_dir() {
            return Err(PipelineError::Discovery(format!(
                "Template root not found: {}",
                root.display()
            )));
        }

        let suffix = format!(".{}", extension);
        let mut names = Vec::new();
        for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                PipelineError::Discovery(format!("Failed to walk {}: {}", root.display(), e))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(root).map_err(|e| {
                PipelineError::Discovery(format!("{}: {}", entry.path().display(), e))
            })?;
            let name = normalize_relative(relative);
            if !name.ends_with(&suffix) {
                continue;
            }

            let source =
                fs::read_to_string(entry.path()).map_err(|e| PipelineError::io_at(entry.path(), e))?;
            env.add_template_owned(name.clone(), source)
                .map_err(|e| PipelineError::Template(format!("{}: {}", name, e)))?;
            names.push(name);
        }
        names.sort();

        tracing::debug!(root = %root.display(), templates = names.len(), "Discovered templates");
        Ok(Self {
            env,
            names,
            extension: extension.to_string(),
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, name: &str) -> Result<Template<'_, '_>, PipelineError> {
        self.env
            .get_template(name)
            .map_err(|e| PipelineError::Template(format!("{}: {}", name, e)))
    }

    /// Templates of `group`, as `(job, filename, name)`, in catalog order.
    pub fn jobs_for_group(&self, group: &str) -> Vec<JobTemplate> {
        let prefix = format!("{}/", group);
        let suffix = format!(".{}", self.extension);
        self.names
            .iter()
            .filter_map(|name| {
                let rest = name.strip_prefix(&prefix)?;
                let rest = rest.strip_suffix(&suffix)?;
                match rest.rsplit_once('/') {
                    Some((job, filename)) if !job.is_empty() && !filename.is_empty() => {
                        Some(JobTemplate {
                            job: job.to_string(),
                            filename: filename.to_string(),
                            name: name.clone(),
                        })
                    }
                    _ => {
                        tracing::warn!(template = %name, "Template is not inside a job directory; skipping");
                        None
                    }
                }
            })
            .collect()
    }
}
