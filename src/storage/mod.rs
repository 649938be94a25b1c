//! Storage collaborators.
//!
//! The core only needs three narrow contracts:
//! - [`BlobStore`]: replay bytes by key
//! - [`RecordStore`]: rank tables by mode/stat key
//! - [`GameSource`]: the games of a mode, each able to produce its metadata
//!
//! Filesystem implementations live under the data directory:
//! - `replays/` raw replay files
//! - `records/` one JSON document per rank table
//! - `index/` the JSONL replay index

mod blob;
mod jsonl;
mod records;

pub use blob::*;
pub use jsonl::*;
pub use records::*;

use std::path::PathBuf;

use thiserror::Error;

use crate::decode::FormatError;
use crate::models::{Metadata, ModeStat, RankEntry};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

/// Errors from loading one game's metadata.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Invalid replay file: {0}")]
    Format(#[from] FormatError),
}

/// Raw replay bytes keyed by name.
pub trait BlobStore: Send + Sync {
    /// Store bytes and return a tag naming where they went.
    fn save(&self, key: &str, bytes: &[u8]) -> Result<String, StorageError>;

    /// Load bytes; `NotFound` if the key was never saved.
    fn load(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Remove bytes; `NotFound` if absent.
    fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Persisted rank tables.
///
/// `put` must replace the whole entry at once: readers see either the old
/// table or the new one.
pub trait RecordStore: Send + Sync {
    fn get(&self, key: &ModeStat) -> Result<Option<RankEntry>, StorageError>;

    fn put(&self, key: &ModeStat, entry: &RankEntry) -> Result<(), StorageError>;

    /// Remove a table. Removing an absent table is not an error.
    fn delete(&self, key: &ModeStat) -> Result<(), StorageError>;
}

/// One recorded game.
pub trait Game {
    fn load_metadata(&self) -> Result<Metadata, ReplayError>;
}

/// Already-decoded metadata is trivially a game.
impl Game for Metadata {
    fn load_metadata(&self) -> Result<Metadata, ReplayError> {
        Ok(self.clone())
    }
}

/// Every game recorded for a mode.
pub trait GameSource: Send + Sync {
    type Game: Game;

    fn list_games(&self, mode: &str) -> Result<Vec<Self::Game>, StorageError>;
}

/// Configuration for storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn replays_dir(&self) -> PathBuf {
        self.data_dir.join("replays")
    }

    pub fn records_dir(&self) -> PathBuf {
        self.data_dir.join("records")
    }

    pub fn index_dir(&self) -> PathBuf {
        self.data_dir.join("index")
    }

    pub fn replay_index_path(&self) -> PathBuf {
        self.index_dir().join("replays.jsonl")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(PathBuf::from("./data"))
    }
}

/// Keys become file names, so path separators and dot-only names are refused.
pub(crate) fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty()
        || key.contains(['/', '\\'])
        || key.chars().all(|c| c == '.')
    {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_config_paths() {
        let config = StorageConfig::new(PathBuf::from("/data"));

        assert_eq!(config.replays_dir(), PathBuf::from("/data/replays"));
        assert_eq!(config.records_dir(), PathBuf::from("/data/records"));
        assert_eq!(config.index_dir(), PathBuf::from("/data/index"));
        assert_eq!(
            config.replay_index_path(),
            PathBuf::from("/data/index/replays.jsonl")
        );
    }

    #[test]
    fn test_storage_config_default() {
        let config = StorageConfig::default();
        assert_eq!(config.data_dir, PathBuf::from("./data"));
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("123.rofl").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("..").is_err());
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("a\\b").is_err());
    }
}
