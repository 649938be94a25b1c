//! Decoded replay header tables and match metadata.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::MatchId;

/// Raw per-player property bag as found in the replay's stats block.
pub type Properties = BTreeMap<String, String>;

/// Fixed-offset length table of the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthFields {
    pub header_length: u16,
    pub file_length: u32,
    pub metadata_offset: u32,
    pub metadata_length: u32,
    pub payload_header_offset: u32,
    pub payload_header_length: u32,
    pub payload_offset: u32,
}

/// Payload header table: match identifiers and chunk/encryption parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadFields {
    pub match_id: u64,
    pub match_length: u32,
    pub key_frame_amount: u32,
    pub chunk_amount: u32,
    pub end_chunk_id: u32,
    pub start_chunk_id: u32,
    pub key_frame_interval: u32,
    pub encryption_key_length: u16,
    pub encryption_key: String,
}

/// Match metadata extracted from a replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Always the payload header's match id
    pub match_id: MatchId,

    /// Game length in milliseconds
    pub game_duration: u64,

    pub game_version: String,
    pub last_game_chunk_id: u32,
    pub last_key_frame_id: u32,

    /// Blue side (TEAM 100), in file order
    pub blue_players: Vec<Properties>,

    /// Red side (TEAM 200), in file order
    pub red_players: Vec<Properties>,
}

impl Metadata {
    /// Game length in minutes.
    pub fn duration_minutes(&self) -> f64 {
        self.game_duration as f64 / 60000.0
    }
}
