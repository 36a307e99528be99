//! Runtime bundles: the files materialized for one job, identified by their content.
//!
//! The bundle id is the BLAKE3 digest of every file's text concatenated in lexicographic
//! filename order, hex encoded. File names are not part of the digest.

use crate::error::PipelineError;
use crate::store::ObjectStore;
use blake3::Hasher;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Rendered files of one job keyed by filename
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeBundle {
    files: BTreeMap<String, String>,
}

impl RuntimeBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, filename: impl Into<String>, content: impl Into<String>) {
        self.files.insert(filename.into(), content.into());
    }

    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Content hash identity of the bundle.
    pub fn id(&self) -> String {
        compute_bundle_id(self.files.values().map(String::as_str))
    }

    /// Write every file under `dir`, creating it as needed.
    pub fn write_local(&self, dir: &Path) -> Result<(), PipelineError> {
        fs::create_dir_all(dir).map_err(|e| PipelineError::io_at(dir, e))?;
        for (filename, content) in &self.files {
            let path = dir.join(filename);
            fs::write(&path, content).map_err(|e| PipelineError::io_at(&path, e))?;
        }
        Ok(())
    }

    /// Upload every file to `{prefix}/{filename}`.
    ///
    /// Every file is attempted even after a failure; the error names all failed files.
    pub fn publish(&self, store: &dyn ObjectStore, prefix: &str) -> Result<(), PipelineError> {
        let prefix = prefix.trim_end_matches('/');
        let mut failed = Vec::new();
        for (filename, content) in &self.files {
            let uri = format!("{}/{}", prefix, filename);
            if let Err(e) = store.write(&uri, content) {
                warn!(file = %filename, uri = %uri, error = %e, "Failed to upload bundle file");
                failed.push(filename.clone());
            } else {
                info!(uri = %uri, "Uploaded bundle file");
            }
        }
        if failed.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::Publish { failed })
        }
    }
}

/// Hash of the concatenated file contents, in the given order.
pub fn compute_bundle_id<'a>(contents: impl IntoIterator<Item = &'a str>) -> String {
    let mut hasher = Hasher::new();
    for content in contents {
        hasher.update(content.as_bytes());
    }
    hex::encode(hasher.finalize().as_bytes())
}
