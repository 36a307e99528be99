//! Jar reference resolution for the identity config.
//!
//! The identity file names a jar by branch and version. Materialization replaces both
//! fields with the concrete jar path, resolving `latest` through the branch's `_CURRENT`
//! marker object.

use crate::config::ArtifactsConfig;
use crate::error::{PipelineError, StoreError};
use crate::store::ObjectStore;
use crate::yaml::{self, KeyOrder};
use serde_yaml::{Mapping, Value};
use tracing::{debug, info};

pub const BRANCH_FIELD: &str = "audienceJarBranch";
pub const VERSION_FIELD: &str = "audienceJarVersion";
pub const PATH_FIELD: &str = "audienceJarPath";

/// Version alias resolved through the marker object (case-insensitive).
pub const LATEST: &str = "latest";
/// Marker object holding the current version on its first line.
pub const MARKER_OBJECT: &str = "_CURRENT";
pub const JAR_FILE: &str = "audience.jar";

/// Branch and version named by an identity config
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JarReference {
    pub branch: String,
    pub version: String,
}

fn field_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(yaml::scalar(&other)),
    }
}

impl JarReference {
    /// Remove the branch and version fields from `doc`.
    ///
    /// Both fields are checked before either is removed, so a failure leaves `doc` intact.
    pub fn take_from(doc: &mut Mapping) -> Result<Self, PipelineError> {
        for field in [BRANCH_FIELD, VERSION_FIELD] {
            if matches!(doc.get(field), None | Some(Value::Null)) {
                return Err(PipelineError::Validation(format!(
                    "{} is required in identity config",
                    field
                )));
            }
        }
        let branch = doc.remove(BRANCH_FIELD).and_then(field_text);
        let version = doc.remove(VERSION_FIELD).and_then(field_text);
        match (branch, version) {
            (Some(branch), Some(version)) => Ok(Self { branch, version }),
            _ => Err(PipelineError::Validation(format!(
                "{} and {} are required in identity config",
                BRANCH_FIELD, VERSION_FIELD
            ))),
        }
    }

    pub fn is_latest(&self) -> bool {
        self.version.eq_ignore_ascii_case(LATEST)
    }
}

/// Resolves jar references against the jar repository.
pub struct JarResolver<'a> {
    config: &'a ArtifactsConfig,
    store: &'a dyn ObjectStore,
}

impl<'a> JarResolver<'a> {
    pub fn new(config: &'a ArtifactsConfig, store: &'a dyn ObjectStore) -> Self {
        Self { config, store }
    }

    fn root(&self) -> &str {
        self.config.jar_root.trim_end_matches('/')
    }

    fn is_main(&self, branch: &str) -> bool {
        branch == self.config.main_branch
    }

    /// URI of the `_CURRENT` marker for `branch`.
    pub fn marker_uri(&self, branch: &str) -> String {
        if self.is_main(branch) {
            format!("{}/prod/{}", self.root(), MARKER_OBJECT)
        } else {
            format!("{}/mergerequests/{}/{}", self.root(), branch, MARKER_OBJECT)
        }
    }

    /// URI of the jar for a concrete version.
    pub fn jar_path(&self, branch: &str, version: &str) -> String {
        if self.is_main(branch) {
            format!(
                "{}/snapshots/{}/{}/{}",
                self.root(),
                self.config.main_branch,
                version,
                JAR_FILE
            )
        } else {
            format!(
                "{}/mergerequests/{}/{}/{}",
                self.root(),
                branch,
                version,
                JAR_FILE
            )
        }
    }

    /// First line of the branch's marker object, trimmed.
    pub fn current_version(&self, branch: &str) -> Result<String, PipelineError> {
        let uri = self.marker_uri(branch);
        let body = match self.store.read(&uri) {
            Ok(body) => body,
            Err(StoreError::NotFound(_)) => {
                return Err(PipelineError::NotFound(format!("No version found in {}", uri)))
            }
            Err(e) => return Err(e.into()),
        };
        match body.lines().next().map(str::trim) {
            Some(version) if !version.is_empty() => {
                debug!(marker = %uri, version, "Resolved current jar version");
                Ok(version.to_string())
            }
            _ => Err(PipelineError::NotFound(format!("No version found in {}", uri))),
        }
    }

    /// Concrete jar path for a reference, reading the marker for `latest`.
    pub fn resolve(&self, reference: &JarReference) -> Result<String, PipelineError> {
        let version = if reference.is_latest() {
            self.current_version(&reference.branch)?
        } else {
            reference.version.clone()
        };
        Ok(self.jar_path(&reference.branch, &version))
    }
}

/// Replace the jar reference fields of a rendered identity config with `audienceJarPath`.
///
/// The result is written with sorted keys.
pub fn inject_jar_path(rendered: &str, resolver: &JarResolver<'_>) -> Result<String, PipelineError> {
    let parsed: Value = serde_yaml::from_str(rendered).map_err(|e| {
        PipelineError::Validation(format!("Failed to parse identity config: {}", e))
    })?;
    let Value::Mapping(mut doc) = parsed else {
        return Err(PipelineError::Validation(
            "Identity config must be a mapping".to_string(),
        ));
    };

    let reference = JarReference::take_from(&mut doc)?;
    let jar_path = resolver.resolve(&reference)?;
    info!(branch = %reference.branch, version = %reference.version, jar = %jar_path, "Resolved jar path");
    doc.insert(Value::from(PATH_FIELD), Value::from(jar_path));
    Ok(yaml::to_string(&Value::Mapping(doc), KeyOrder::Sorted))
}
