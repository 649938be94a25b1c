//! Replay library: the replay index plus the blob store holding the bytes.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::decode::decode;
use crate::models::{Checksum, MatchId, Metadata, ReplayRecord};
use crate::storage::{
    BlobStore, Game, GameSource, JsonlReader, JsonlWriter, ReplayError, StorageError,
};

/// JSONL index of stored replays.
#[derive(Debug, Clone)]
pub struct ReplayIndex {
    path: PathBuf,
}

impl ReplayIndex {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn reader(&self) -> JsonlReader<ReplayRecord> {
        JsonlReader::new(self.path.clone())
    }

    fn writer(&self) -> JsonlWriter<ReplayRecord> {
        JsonlWriter::new(self.path.clone())
    }

    pub fn all(&self) -> Result<Vec<ReplayRecord>, StorageError> {
        self.reader().read_all()
    }

    pub fn find(&self, match_id: MatchId) -> Result<Option<ReplayRecord>, StorageError> {
        Ok(self.all()?.into_iter().find(|r| r.match_id == match_id))
    }

    pub fn by_mode(&self, mode: &str) -> Result<Vec<ReplayRecord>, StorageError> {
        self.reader().read_where(|r| r.mode == mode)
    }

    /// Every mode with at least one replay, sorted.
    pub fn modes(&self) -> Result<Vec<String>, StorageError> {
        let modes: BTreeSet<String> = self.all()?.into_iter().map(|r| r.mode).collect();
        Ok(modes.into_iter().collect())
    }

    pub fn append(&self, record: &ReplayRecord) -> Result<(), StorageError> {
        self.writer().append(record)
    }

    /// Replace the record with the same match id.
    pub fn update(&self, record: &ReplayRecord) -> Result<(), StorageError> {
        let mut records = self.all()?;
        let slot = records
            .iter_mut()
            .find(|r| r.match_id == record.match_id)
            .ok_or_else(|| StorageError::NotFound(record.match_id.to_string()))?;
        *slot = record.clone();
        self.writer().write_all(&records)?;
        Ok(())
    }

    /// Drop a record, returning it.
    pub fn remove(&self, match_id: MatchId) -> Result<ReplayRecord, StorageError> {
        let mut records = self.all()?;
        let position = records
            .iter()
            .position(|r| r.match_id == match_id)
            .ok_or_else(|| StorageError::NotFound(match_id.to_string()))?;
        let removed = records.remove(position);
        self.writer().write_all(&records)?;
        Ok(removed)
    }
}

/// Stored replays of every mode.
///
/// Index writes go through one lock so read-modify-write updates do not
/// interleave.
pub struct ReplayLibrary<B> {
    index: ReplayIndex,
    blobs: Arc<B>,
    write_lock: Mutex<()>,
}

impl<B: BlobStore> ReplayLibrary<B> {
    pub fn new(index: ReplayIndex, blobs: B) -> Self {
        Self {
            index,
            blobs: Arc::new(blobs),
            write_lock: Mutex::new(()),
        }
    }

    pub fn index(&self) -> &ReplayIndex {
        &self.index
    }

    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    /// Run an index mutation under the write lock.
    pub(crate) fn with_write_lock<T, E>(
        &self,
        f: impl FnOnce(&ReplayIndex, &B) -> Result<T, E>,
    ) -> Result<T, E> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        f(&self.index, &self.blobs)
    }

    /// Raw bytes of a stored replay.
    pub fn load_replay(&self, record: &ReplayRecord) -> Result<Vec<u8>, StorageError> {
        self.blobs.load(&record.blob_key())
    }
}

/// One indexed replay, decoded lazily.
pub struct StoredGame<B> {
    pub record: ReplayRecord,
    blobs: Arc<B>,
}

impl<B: BlobStore> Game for StoredGame<B> {
    fn load_metadata(&self) -> Result<Metadata, ReplayError> {
        if let Some(metadata) = &self.record.metadata {
            return Ok(metadata.clone());
        }

        debug!("Decoding match {} from blob", self.record.match_id);
        let bytes = self.blobs.load(&self.record.blob_key())?;
        if Checksum::of(&bytes) != self.record.checksum {
            warn!("Checksum mismatch for match {}", self.record.match_id);
        }
        Ok(decode(&bytes)?)
    }
}

impl<B: BlobStore> GameSource for ReplayLibrary<B> {
    type Game = StoredGame<B>;

    fn list_games(&self, mode: &str) -> Result<Vec<StoredGame<B>>, StorageError> {
        Ok(self
            .index
            .by_mode(mode)?
            .into_iter()
            .map(|record| StoredGame {
                record,
                blobs: self.blobs.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{ContainerBuilder, PlayerProps};
    use crate::storage::MemoryBlobStore;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn record(bytes: &[u8], mode: &str, cache_metadata: bool) -> ReplayRecord {
        let mut record = ReplayRecord::new(
            decode(bytes).unwrap(),
            mode.to_string(),
            NaiveDate::from_ymd_opt(2020, 3, 14).unwrap(),
            MemoryBlobStore::LOCATION.to_string(),
            Checksum::of(bytes),
        );
        if !cache_metadata {
            record.metadata = None;
        }
        record
    }

    fn replay(match_id: u64) -> Vec<u8> {
        ContainerBuilder::new(match_id)
            .player(PlayerProps::new("Alpha", "100").build())
            .player(PlayerProps::new("Bravo", "200").build())
            .build()
    }

    #[test]
    fn test_index_crud() {
        let temp_dir = TempDir::new().unwrap();
        let index = ReplayIndex::new(temp_dir.path().join("replays.jsonl"));

        index.append(&record(&replay(1), "inhouse", true)).unwrap();
        index.append(&record(&replay(2), "aram", true)).unwrap();
        index.append(&record(&replay(3), "inhouse", true)).unwrap();

        assert_eq!(index.all().unwrap().len(), 3);
        assert_eq!(index.by_mode("inhouse").unwrap().len(), 2);
        assert_eq!(index.modes().unwrap(), vec!["aram", "inhouse"]);
        assert!(index.find(MatchId(2)).unwrap().is_some());

        let mut moved = index.find(MatchId(2)).unwrap().unwrap();
        moved.storage_location = "archive".to_string();
        index.update(&moved).unwrap();
        assert_eq!(
            index.find(MatchId(2)).unwrap().unwrap().storage_location,
            "archive"
        );

        let removed = index.remove(MatchId(1)).unwrap();
        assert_eq!(removed.match_id, MatchId(1));
        assert!(index.find(MatchId(1)).unwrap().is_none());
        assert!(matches!(
            index.remove(MatchId(1)),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_games_by_mode() {
        let temp_dir = TempDir::new().unwrap();
        let library = ReplayLibrary::new(
            ReplayIndex::new(temp_dir.path().join("replays.jsonl")),
            MemoryBlobStore::default(),
        );
        library.index().append(&record(&replay(1), "inhouse", true)).unwrap();
        library.index().append(&record(&replay(2), "aram", true)).unwrap();

        let games = library.list_games("inhouse").unwrap();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].load_metadata().unwrap().match_id, MatchId(1));
        assert!(library.list_games("urf").unwrap().is_empty());
    }

    #[test]
    fn test_uncached_game_decodes_blob() {
        let temp_dir = TempDir::new().unwrap();
        let library = ReplayLibrary::new(
            ReplayIndex::new(temp_dir.path().join("replays.jsonl")),
            MemoryBlobStore::default(),
        );
        let bytes = replay(7);
        let rec = record(&bytes, "inhouse", false);
        library.blobs().save(&rec.blob_key(), &bytes).unwrap();
        library.index().append(&rec).unwrap();

        let games = library.list_games("inhouse").unwrap();
        let metadata = games[0].load_metadata().unwrap();
        assert_eq!(metadata, decode(&bytes).unwrap());
    }

    #[test]
    fn test_uncached_game_missing_blob_is_storage_error() {
        let temp_dir = TempDir::new().unwrap();
        let library = ReplayLibrary::new(
            ReplayIndex::new(temp_dir.path().join("replays.jsonl")),
            MemoryBlobStore::default(),
        );
        library.index().append(&record(&replay(8), "inhouse", false)).unwrap();

        let games = library.list_games("inhouse").unwrap();
        assert!(matches!(
            games[0].load_metadata(),
            Err(ReplayError::Storage(StorageError::NotFound(_)))
        ));
    }

    #[test]
    fn test_corrupt_blob_is_format_error() {
        let temp_dir = TempDir::new().unwrap();
        let library = ReplayLibrary::new(
            ReplayIndex::new(temp_dir.path().join("replays.jsonl")),
            MemoryBlobStore::default(),
        );
        let rec = record(&replay(9), "inhouse", false);
        library.blobs().save(&rec.blob_key(), b"not a replay").unwrap();
        library.index().append(&rec).unwrap();

        let games = library.list_games("inhouse").unwrap();
        assert!(matches!(
            games[0].load_metadata(),
            Err(ReplayError::Format(_))
        ));
    }
}
