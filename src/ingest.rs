//! Adding, removing and relocating replays in the library.

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::decode::{decode, FormatError};
use crate::library::ReplayLibrary;
use crate::models::{Checksum, MatchId, ReplayRecord};
use crate::storage::{BlobStore, StorageError};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Invalid replay file: {0}")]
    InvalidReplay(#[from] FormatError),

    #[error("Match {0} has already been uploaded")]
    Duplicate(MatchId),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Decode and store one uploaded replay.
///
/// The replay is decoded before anything is written, so a bad upload leaves
/// no blob behind. The returned record carries the decoded metadata.
pub fn ingest_replay<B: BlobStore>(
    library: &ReplayLibrary<B>,
    bytes: &[u8],
    mode: &str,
    date: NaiveDate,
) -> Result<ReplayRecord, IngestError> {
    let metadata = decode(bytes)?;
    let match_id = metadata.match_id;
    let checksum = Checksum::of(bytes);

    library.with_write_lock(|index, blobs| {
        if index.find(match_id)?.is_some() {
            return Err(IngestError::Duplicate(match_id));
        }

        let location = blobs.save(&match_id.blob_key(), bytes)?;
        let record = ReplayRecord::new(metadata, mode.to_string(), date, location, checksum);
        index.append(&record)?;

        info!(
            "Ingested match {} ({} bytes) into mode {:?}",
            match_id,
            bytes.len(),
            mode
        );
        Ok(record)
    })
}

/// Remove a replay's blob and index entry.
///
/// A blob that is already gone is logged and the index entry is still
/// removed.
pub fn delete_replay<B: BlobStore>(
    library: &ReplayLibrary<B>,
    match_id: MatchId,
) -> Result<ReplayRecord, StorageError> {
    library.with_write_lock(|index, blobs| {
        let record = index
            .find(match_id)?
            .ok_or_else(|| StorageError::NotFound(match_id.to_string()))?;

        match blobs.delete(&record.blob_key()) {
            Ok(()) => {}
            Err(StorageError::NotFound(key)) => warn!("Blob {} was already missing", key),
            Err(e) => return Err(e),
        }
        let removed = index.remove(match_id)?;

        info!("Deleted match {} from mode {:?}", match_id, removed.mode);
        Ok(removed)
    })
}

/// Outcome of a migration run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MigrationReport {
    pub moved: usize,
    /// Replays the source store did not hold
    pub skipped: usize,
}

/// Move every indexed replay from `source` into the library's own store.
///
/// Each replay is loaded, saved, deleted from the source and its storage
/// location updated, one at a time. The first storage error stops the run;
/// replays moved before it stay moved.
pub fn migrate_replays<B: BlobStore>(
    library: &ReplayLibrary<B>,
    source: &dyn BlobStore,
) -> Result<MigrationReport, StorageError> {
    library.with_write_lock(|index, blobs| {
        let mut report = MigrationReport::default();

        for mut record in index.all()? {
            let key = record.blob_key();
            let bytes = match source.load(&key) {
                Ok(bytes) => bytes,
                Err(StorageError::NotFound(_)) => {
                    debug!("Match {} not in source store, skipping", record.match_id);
                    report.skipped += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let location = blobs.save(&key, &bytes)?;
            source.delete(&key)?;
            record.storage_location = location;
            index.update(&record)?;

            debug!("Migrated match {}", record.match_id);
            report.moved += 1;
        }

        info!(
            "Migration finished: {} moved, {} skipped",
            report.moved, report.skipped
        );
        Ok(report)
    })
}
