//! Remote object store: read one object, write one object.
//!
//! Objects are addressed by `scheme://bucket/key` URIs. Operations are synchronous and
//! never retried; callers decide how failures aggregate.

use crate::config::{StoreBackend, StoreConfig};
use crate::error::{PipelineError, StoreError};
use std::path::Path;

pub mod fs;
pub mod http;

pub use fs::FsObjectStore;
pub use http::HttpObjectStore;

/// Single-object read/write
pub trait ObjectStore {
    /// Read an object as UTF-8 text.
    fn read(&self, uri: &str) -> Result<String, StoreError>;

    /// Create or replace an object.
    fn write(&self, uri: &str, body: &str) -> Result<(), StoreError>;
}

/// Bucket and key of an object URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation<'a> {
    pub scheme: &'a str,
    pub bucket: &'a str,
    pub key: &'a str,
}

/// Split `scheme://bucket/key`; both bucket and key must be non-empty.
pub fn parse_uri(uri: &str) -> Result<ObjectLocation<'_>, StoreError> {
    let (scheme, rest) = uri
        .split_once("://")
        .ok_or_else(|| StoreError::InvalidUri(uri.to_string()))?;
    let (bucket, key) = rest
        .split_once('/')
        .ok_or_else(|| StoreError::InvalidUri(uri.to_string()))?;
    if scheme.is_empty() || bucket.is_empty() || key.is_empty() {
        return Err(StoreError::InvalidUri(uri.to_string()));
    }
    Ok(ObjectLocation {
        scheme,
        bucket,
        key,
    })
}

/// Build the configured backend. Relative fs roots resolve against `workspace_root`.
pub fn from_config(
    config: &StoreConfig,
    workspace_root: &Path,
) -> Result<Box<dyn ObjectStore>, PipelineError> {
    match config.backend {
        StoreBackend::Fs => Ok(Box::new(FsObjectStore::new(workspace_root.join(&config.root)))),
        StoreBackend::Http => {
            let endpoint = config.endpoint.clone().ok_or_else(|| {
                PipelineError::ConfigError("store.endpoint is required for the http backend".into())
            })?;
            Ok(Box::new(HttpObjectStore::new(endpoint, config.timeout_secs)?))
        }
    }
}
