//! Rank table stores.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::RwLock;

use tracing::debug;

use super::jsonl::tmp_path;
use super::{RecordStore, StorageError};
use crate::models::{ModeStat, RankEntry};

/// One JSON document per rank table.
///
/// File names are the hex-encoded mode/stat key so free-form modes are safe on
/// disk. `put` writes a temp file and renames it over the old document.
#[derive(Debug, Clone)]
pub struct FsRecordStore {
    dir: PathBuf,
}

impl FsRecordStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path(&self, key: &ModeStat) -> PathBuf {
        self.dir
            .join(format!("{}.json", hex::encode(key.as_str().as_bytes())))
    }
}

impl RecordStore for FsRecordStore {
    fn get(&self, key: &ModeStat) -> Result<Option<RankEntry>, StorageError> {
        let contents = match fs::read(self.path(key)) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&contents)?))
    }

    fn put(&self, key: &ModeStat, entry: &RankEntry) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path(key);
        let tmp = tmp_path(&path);

        fs::write(&tmp, serde_json::to_vec(entry)?)?;
        fs::rename(&tmp, &path)?;

        debug!("Stored rank table {} at {:?}", key, path);
        Ok(())
    }

    fn delete(&self, key: &ModeStat) -> Result<(), StorageError> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Rank tables held in process memory.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    entries: RwLock<HashMap<ModeStat, RankEntry>>,
}

impl RecordStore for MemoryRecordStore {
    fn get(&self, key: &ModeStat) -> Result<Option<RankEntry>, StorageError> {
        Ok(self
            .entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned())
    }

    fn put(&self, key: &ModeStat, entry: &RankEntry) -> Result<(), StorageError> {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.clone(), entry.clone());
        Ok(())
    }

    fn delete(&self, key: &ModeStat) -> Result<(), StorageError> {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        Ok(())
    }
}
