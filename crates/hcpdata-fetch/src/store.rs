//! Object store backed by a local directory tree
//!
//! Serves a bucket that is already mounted or mirrored on disk (for example
//! through a FUSE mount). Keys are `/`-separated paths below the root.

use hcpdata_core::{Error, ObjectStore, Result, StoreConnector};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> PathBuf {
        key.split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |path, part| path.join(part))
    }
}

impl ObjectStore for DirectoryStore {
    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.resolve(key).exists())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let dir = self.resolve(prefix);
        let entries = fs::read_dir(&dir)
            .map_err(|e| Error::transport(format!("cannot list {}: {}", prefix, e)))?;

        let prefix = prefix.trim_end_matches('/');
        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::transport(e.to_string()))?;
            keys.push(format!("{}/{}", prefix, entry.file_name().to_string_lossy()));
        }
        keys.sort();
        Ok(keys)
    }

    fn get(&self, key: &str, local: &Path) -> Result<()> {
        let source = self.resolve(key);
        fs::copy(&source, local)
            .map_err(|e| Error::transport(format!("cannot copy {}: {}", key, e)))?;
        Ok(())
    }
}

/// A directory mirror needs no credentials; the pair is accepted and ignored
impl StoreConnector for DirectoryStore {
    fn connect(&self, _key: &str, _secret: &str) -> Result<Arc<dyn ObjectStore>> {
        if !self.root.is_dir() {
            return Err(Error::transport(format!(
                "store root {} is not a directory",
                self.root.display()
            )));
        }
        Ok(Arc::new(self.clone()))
    }
}
