//! Key-value blob storage behind the catalog store
//!
//! A backend stores opaque string blobs under string keys. Each `save` is a
//! single atomic replacement of the blob, so readers never observe a
//! half-written value.

use crate::temp::write_temp_file;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, trace};

/// Errors that can occur while reading or writing blobs
#[derive(Debug, Error)]
pub enum BackendError {
    /// Failed to determine the data directory location
    #[error("Failed to determine data directory location")]
    DataDirectoryNotFound,

    /// Failed to create or access the data directory
    #[error("Failed to create data directory at {path}: {source}")]
    DirectoryCreationFailed { path: PathBuf, source: io::Error },

    /// Failed to read a stored blob
    #[error("Failed to read {path}: {source}")]
    ReadFailed { path: PathBuf, source: io::Error },

    /// Failed to write a blob
    #[error("Failed to write {path}: {source}")]
    WriteFailed { path: PathBuf, source: io::Error },
}

/// Storage primitive for whole-blob reads and writes
pub trait StorageBackend {
    /// Loads the blob stored under `key`, or `None` if nothing is stored
    fn load(&self, key: &str) -> Result<Option<String>, BackendError>;

    /// Replaces the blob stored under `key`
    fn save(&mut self, key: &str, blob: &str) -> Result<(), BackendError>;
}

/// Stores each key as a `<key>.json` file inside a directory
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Opens a backend rooted at `dir`, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, BackendError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| BackendError::DirectoryCreationFailed {
            path: dir.clone(),
            source: e,
        })?;
        Ok(Self { dir })
    }

    /// Opens a backend in the platform's standard data directory
    pub fn open_default() -> Result<Self, BackendError> {
        let dir = crate::config::default_data_dir().ok_or(BackendError::DataDirectoryNotFound)?;
        Self::open(dir)
    }

    /// Returns the directory holding the blobs
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl StorageBackend for FileBackend {
    fn load(&self, key: &str) -> Result<Option<String>, BackendError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BackendError::ReadFailed { path, source: e }),
        }
    }

    fn save(&mut self, key: &str, blob: &str) -> Result<(), BackendError> {
        let path = self.path_for(key);
        let write = || -> io::Result<()> {
            let temp = write_temp_file(&self.dir, key, "tmp", blob.as_bytes())?;
            trace!(temp = %temp.path().display(), "replacing blob");
            temp.persist(&path)
        };
        write().map_err(|e| BackendError::WriteFailed {
            path: path.clone(),
            source: e,
        })?;
        debug!(path = %path.display(), bytes = blob.len(), "blob written");
        Ok(())
    }
}

/// Keeps blobs in memory only
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    blobs: HashMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn load(&self, key: &str) -> Result<Option<String>, BackendError> {
        Ok(self.blobs.get(key).cloned())
    }

    fn save(&mut self, key: &str, blob: &str) -> Result<(), BackendError> {
        self.blobs.insert(key.to_string(), blob.to_string());
        Ok(())
    }
}
