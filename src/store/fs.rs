//! Filesystem-backed object store: `scheme://bucket/key` maps to `{root}/{bucket}/{key}`.

use super::{parse_uri, ObjectStore};
use crate::error::StoreError;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Local path of an object; keys may not escape the bucket directory.
    pub fn object_path(&self, uri: &str) -> Result<PathBuf, StoreError> {
        let location = parse_uri(uri)?;
        let key = Path::new(location.key);
        if key
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(StoreError::InvalidUri(uri.to_string()));
        }
        Ok(self.root.join(location.bucket).join(key))
    }
}

impl ObjectStore for FsObjectStore {
    fn read(&self, uri: &str) -> Result<String, StoreError> {
        let path = self.object_path(uri)?;
        fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StoreError::NotFound(uri.to_string()),
            _ => StoreError::IoError(e),
        })
    }

    fn write(&self, uri: &str, body: &str) -> Result<(), StoreError> {
        let path = self.object_path(uri)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Write to a sibling temp file, then rename, so readers never see a partial object
        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp = path.with_file_name(tmp_name);
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}
