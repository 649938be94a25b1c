//! Replay blob stores.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::debug;

use super::jsonl::tmp_path;
use super::{validate_key, BlobStore, StorageError};

/// Blobs as files in one directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    dir: PathBuf,
}

impl FsBlobStore {
    /// Location tag recorded for blobs saved here.
    pub const LOCATION: &'static str = "fs";

    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether both stores resolve to the same directory.
    pub fn same_dir(&self, other: &FsBlobStore) -> bool {
        match (self.dir.canonicalize(), other.dir.canonicalize()) {
            (Ok(a), Ok(b)) => a == b,
            _ => self.dir == other.dir,
        }
    }

    fn path(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.dir.join(key))
    }
}

impl BlobStore for FsBlobStore {
    fn save(&self, key: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let path = self.path(key)?;
        fs::create_dir_all(&self.dir)?;

        let tmp = tmp_path(&path);
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;

        debug!("Saved {} bytes to {:?}", bytes.len(), path);
        Ok(Self::LOCATION.to_string())
    }

    fn load(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path(key)?;
        fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(key.to_string()),
            _ => StorageError::Io(e),
        })
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path(key)?;
        fs::remove_file(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(key.to_string()),
            _ => StorageError::Io(e),
        })?;
        debug!("Deleted {:?}", path);
        Ok(())
    }
}

/// Blobs held in process memory.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub const LOCATION: &'static str = "memory";

    pub fn len(&self) -> usize {
        self.blobs.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobStore for MemoryBlobStore {
    fn save(&self, key: &str, bytes: &[u8]) -> Result<String, StorageError> {
        validate_key(key)?;
        self.blobs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), bytes.to_vec());
        Ok(Self::LOCATION.to_string())
    }

    fn load(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        validate_key(key)?;
        self.blobs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        self.blobs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }
}
