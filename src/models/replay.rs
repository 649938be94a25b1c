//! Stored replay records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{Checksum, MatchId, Metadata};

/// Replay record kept in the replay index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayRecord {
    pub match_id: MatchId,

    /// Free-form game mode used to partition rankings
    pub mode: String,

    /// Date the game was played
    pub date: NaiveDate,

    /// Location tag returned by the blob store that holds the bytes
    pub storage_location: String,

    pub checksum: Checksum,

    /// Decoded metadata, cached to avoid re-decoding the blob
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,

    pub created_at: DateTime<Utc>,
}

impl ReplayRecord {
    pub fn new(
        metadata: Metadata,
        mode: String,
        date: NaiveDate,
        storage_location: String,
        checksum: Checksum,
    ) -> Self {
        Self {
            match_id: metadata.match_id,
            mode,
            date,
            storage_location,
            checksum,
            metadata: Some(metadata),
            created_at: Utc::now(),
        }
    }

    /// Key of the replay bytes in the blob store.
    pub fn blob_key(&self) -> String {
        self.match_id.blob_key()
    }
}
