//! ROFL container decoding.
//!
//! A replay file is laid out as:
//!
//! ```text
//! offset 0    len 4    magic "RIOT" (52 49 4F 54)
//! offset 262  len 26   length table (little-endian)
//! payloadHeaderOffset  payload header: match id, chunk counts, encryption key
//! metadataOffset       UTF-8 JSON with an escaped `statsJson` player list
//! ```
//!
//! All positions are format constants or come from the length table; nothing
//! is found by scanning. Decoding is a pure function of the input bytes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::models::{LengthFields, MatchId, Metadata, PayloadFields, Properties, Team};

/// File signature ("RIOT").
pub const MAGIC: [u8; 4] = [0x52, 0x49, 0x4F, 0x54];

/// Position of the length table.
pub const LENGTH_FIELDS_OFFSET: usize = 262;

/// Size of the length table.
pub const LENGTH_FIELDS_SIZE: usize = 26;

/// Fixed part of the payload header; the encryption key follows it.
pub const PAYLOAD_FIELDS_SIZE: usize = 34;

/// Errors raised for a replay that does not follow the container format.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Invalid magic number")]
    BadMagic,

    #[error("Truncated {section}: needs bytes {start}..{end} but file has {len}")]
    Truncated {
        section: &'static str,
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("{section} is not valid UTF-8")]
    InvalidUtf8 { section: &'static str },

    #[error("Malformed metadata JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Player entry {0} has no TEAM")]
    MissingTeam(usize),
}

/// Every table of a decoded container.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Container {
    pub length_fields: LengthFields,
    pub payload_fields: PayloadFields,
    pub metadata: Metadata,
}

/// JSON metadata block. Unknown keys (including any embedded match id) are ignored.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetadataBlock {
    game_length: u64,
    #[serde(default)]
    game_version: String,
    #[serde(default)]
    last_game_chunk_id: u32,
    #[serde(default)]
    last_key_frame_id: u32,
    stats_json: String,
}

/// Decode a replay into its match metadata.
pub fn decode(bytes: &[u8]) -> Result<Metadata, FormatError> {
    decode_container(bytes).map(|container| container.metadata)
}

/// Decode a replay, keeping the raw header tables alongside the metadata.
pub fn decode_container(bytes: &[u8]) -> Result<Container, FormatError> {
    check_magic(bytes)?;

    let length_fields = read_length_fields(bytes)?;
    let payload_fields = read_payload_fields(bytes, &length_fields)?;
    let mut metadata = read_metadata(bytes, &length_fields)?;
    metadata.match_id = MatchId(payload_fields.match_id);

    debug!(
        "Decoded match {} ({} blue, {} red players)",
        metadata.match_id,
        metadata.blue_players.len(),
        metadata.red_players.len()
    );

    Ok(Container {
        length_fields,
        payload_fields,
        metadata,
    })
}

/// Check the 4-byte file signature.
pub fn check_magic(bytes: &[u8]) -> Result<(), FormatError> {
    if bytes.len() < MAGIC.len() || bytes[..MAGIC.len()] != MAGIC {
        return Err(FormatError::BadMagic);
    }
    Ok(())
}

/// Read the length table at its fixed offset.
pub fn read_length_fields(bytes: &[u8]) -> Result<LengthFields, FormatError> {
    let table = section(
        bytes,
        "length table",
        LENGTH_FIELDS_OFFSET,
        LENGTH_FIELDS_SIZE,
    )?;

    Ok(LengthFields {
        header_length: le_u16(table, 0),
        file_length: le_u32(table, 2),
        metadata_offset: le_u32(table, 6),
        metadata_length: le_u32(table, 10),
        payload_header_offset: le_u32(table, 14),
        payload_header_length: le_u32(table, 18),
        payload_offset: le_u32(table, 22),
    })
}

/// Read the payload header located by the length table.
pub fn read_payload_fields(
    bytes: &[u8],
    lengths: &LengthFields,
) -> Result<PayloadFields, FormatError> {
    let start = lengths.payload_header_offset as usize;
    let header = section(bytes, "payload header", start, PAYLOAD_FIELDS_SIZE)?;
    let encryption_key_length = le_u16(header, 32);

    let key_bytes = section(
        bytes,
        "encryption key",
        start + PAYLOAD_FIELDS_SIZE,
        encryption_key_length as usize,
    )?;
    let encryption_key = std::str::from_utf8(key_bytes)
        .map_err(|_| FormatError::InvalidUtf8 {
            section: "encryption key",
        })?
        .to_string();

    Ok(PayloadFields {
        match_id: le_u64(header, 0),
        match_length: le_u32(header, 8),
        key_frame_amount: le_u32(header, 12),
        chunk_amount: le_u32(header, 16),
        end_chunk_id: le_u32(header, 20),
        start_chunk_id: le_u32(header, 24),
        key_frame_interval: le_u32(header, 28),
        encryption_key_length,
        encryption_key,
    })
}

/// Parse the JSON metadata block and split players by side.
///
/// The returned match id is a placeholder; the payload header is authoritative.
fn read_metadata(bytes: &[u8], lengths: &LengthFields) -> Result<Metadata, FormatError> {
    let raw = section(
        bytes,
        "metadata",
        lengths.metadata_offset as usize,
        lengths.metadata_length as usize,
    )?;
    let json = std::str::from_utf8(raw).map_err(|_| FormatError::InvalidUtf8 {
        section: "metadata",
    })?;
    let block: MetadataBlock = serde_json::from_str(json)?;

    let mut blue_players = Vec::new();
    let mut red_players = Vec::new();

    for (index, entry) in parse_stats_json(&block.stats_json)?.into_iter().enumerate() {
        let props = to_properties(entry);
        let team = props
            .get("TEAM")
            .ok_or(FormatError::MissingTeam(index))?;
        match Team::from_raw(team) {
            Some(Team::Blue) => blue_players.push(props),
            Some(Team::Red) => red_players.push(props),
            None => debug!("Dropping player entry {} with TEAM={}", index, team),
        }
    }

    Ok(Metadata {
        match_id: MatchId(0),
        game_duration: block.game_length,
        game_version: block.game_version,
        last_game_chunk_id: block.last_game_chunk_id,
        last_key_frame_id: block.last_key_frame_id,
        blue_players,
        red_players,
    })
}

/// Parse the nested player list.
///
/// JSON decoding of the outer block already removes one level of escaping.
/// Some writers escape the inner document twice, so a second unescape is tried
/// before giving up.
fn parse_stats_json(stats_json: &str) -> Result<Vec<Map<String, Value>>, FormatError> {
    match serde_json::from_str(stats_json) {
        Ok(players) => Ok(players),
        Err(first) => {
            let unescaped: String = match serde_json::from_str(&format!("\"{}\"", stats_json)) {
                Ok(s) => s,
                Err(_) => return Err(first.into()),
            };
            serde_json::from_str(&unescaped).map_err(|_| first.into())
        }
    }
}

/// Flatten one player object into string properties.
fn to_properties(entry: Map<String, Value>) -> Properties {
    entry
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::Null => None,
            Value::String(s) => Some((key, s)),
            other => Some((key, other.to_string())),
        })
        .collect()
}

/// Bounds-checked sub-slice.
fn section<'a>(
    bytes: &'a [u8],
    name: &'static str,
    start: usize,
    len: usize,
) -> Result<&'a [u8], FormatError> {
    let truncated = || FormatError::Truncated {
        section: name,
        start,
        end: start.saturating_add(len),
        len: bytes.len(),
    };
    let end = start.checked_add(len).ok_or_else(truncated)?;
    bytes.get(start..end).ok_or_else(truncated)
}

fn le_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

fn le_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn le_u64(buf: &[u8], at: usize) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(word)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{ContainerBuilder, PlayerProps};
    use pretty_assertions::assert_eq;

    fn five_v_five() -> ContainerBuilder {
        let mut builder = ContainerBuilder::new(4_242_424_242);
        for i in 0..5 {
            builder = builder
                .player(PlayerProps::new(&format!("Blue {}", i), "100").build())
                .player(PlayerProps::new(&format!("Red {}", i), "200").build());
        }
        builder
    }

    #[test]
    fn test_decode_splits_teams_in_order() {
        let metadata = decode(&five_v_five().build()).unwrap();

        assert_eq!(metadata.match_id, MatchId(4_242_424_242));
        assert_eq!(metadata.blue_players.len(), 5);
        assert_eq!(metadata.red_players.len(), 5);
        assert_eq!(metadata.blue_players[0]["NAME"], "Blue 0");
        assert_eq!(metadata.blue_players[4]["NAME"], "Blue 4");
        assert_eq!(metadata.red_players[2]["NAME"], "Red 2");
    }

    #[test]
    fn test_decode_reads_metadata_fields() {
        let bytes = five_v_five().game_length(1_654_321).build();
        let metadata = decode(&bytes).unwrap();

        assert_eq!(metadata.game_duration, 1_654_321);
        assert_eq!(metadata.game_version, "10.4.308.9999");
        assert_eq!(metadata.last_game_chunk_id, 28);
        assert_eq!(metadata.last_key_frame_id, 14);
    }

    #[test]
    fn test_decode_is_deterministic() {
        let bytes = five_v_five().build();
        assert_eq!(decode(&bytes).unwrap(), decode(&bytes).unwrap());
    }

    #[test]
    fn test_bad_magic_always_fails() {
        let valid = five_v_five().build();

        for bad in [[0u8, 0, 0, 0], [0x52, 0x49, 0x4F, 0x55], [0x54, 0x4F, 0x49, 0x52]] {
            let mut bytes = valid.clone();
            bytes[..4].copy_from_slice(&bad);
            assert!(matches!(decode(&bytes), Err(FormatError::BadMagic)));
        }
    }

    #[test]
    fn test_short_buffers_fail_cleanly() {
        assert!(matches!(decode(&[]), Err(FormatError::BadMagic)));
        assert!(matches!(decode(&MAGIC), Err(FormatError::Truncated { .. })));

        let bytes = five_v_five().build();
        let truncated = &bytes[..bytes.len() - 10];
        assert!(matches!(
            decode(truncated),
            Err(FormatError::Truncated { .. })
        ));
    }

    #[test]
    fn test_match_id_comes_from_payload_header() {
        let bytes = ContainerBuilder::new(77)
            .extra_metadata("matchId", serde_json::json!(99))
            .player(PlayerProps::new("Solo", "100").build())
            .build();

        assert_eq!(decode(&bytes).unwrap().match_id, MatchId(77));
    }

    #[test]
    fn test_length_fields_layout() {
        let bytes = five_v_five().build();
        let lengths = read_length_fields(&bytes).unwrap();

        assert_eq!(lengths.header_length, 288);
        assert_eq!(lengths.file_length as usize, bytes.len());
        assert_eq!(lengths.metadata_offset, 288);
        assert_eq!(
            lengths.payload_header_offset,
            lengths.metadata_offset + lengths.metadata_length
        );
    }

    #[test]
    fn test_payload_fields() {
        let bytes = ContainerBuilder::new(123_456_789_012)
            .encryption_key("c2VjcmV0LWtleQ==")
            .build();
        let lengths = read_length_fields(&bytes).unwrap();
        let payload = read_payload_fields(&bytes, &lengths).unwrap();

        assert_eq!(payload.match_id, 123_456_789_012);
        assert_eq!(payload.match_length, 1_800_000);
        assert_eq!(payload.key_frame_amount, 15);
        assert_eq!(payload.chunk_amount, 29);
        assert_eq!(payload.end_chunk_id, 29);
        assert_eq!(payload.start_chunk_id, 1);
        assert_eq!(payload.key_frame_interval, 60_000);
        assert_eq!(payload.encryption_key_length, 16);
        assert_eq!(payload.encryption_key, "c2VjcmV0LWtleQ==");
    }

    #[test]
    fn test_unknown_team_dropped() {
        let bytes = ContainerBuilder::new(1)
            .player(PlayerProps::new("Blue", "100").build())
            .player(PlayerProps::new("Spectator", "300").build())
            .player(PlayerProps::new("Red", "200").build())
            .build();
        let metadata = decode(&bytes).unwrap();

        assert_eq!(metadata.blue_players.len(), 1);
        assert_eq!(metadata.red_players.len(), 1);
    }

    #[test]
    fn test_missing_team_is_format_error() {
        let mut props = PlayerProps::new("Nobody", "100").build();
        props.remove("TEAM");
        let bytes = ContainerBuilder::new(1).player(props).build();

        assert!(matches!(decode(&bytes), Err(FormatError::MissingTeam(0))));
    }

    #[test]
    fn test_malformed_metadata_json() {
        let bytes = ContainerBuilder::new(1).raw_metadata("{not json").build();
        assert!(matches!(decode(&bytes), Err(FormatError::Json(_))));

        let bytes = ContainerBuilder::new(1)
            .raw_metadata(r#"{"gameLength": 1000}"#)
            .build();
        assert!(matches!(decode(&bytes), Err(FormatError::Json(_))));
    }

    #[test]
    fn test_double_escaped_stats_json() {
        let inner = r#"[{\"NAME\":\"Escaped\",\"TEAM\":\"200\"}]"#;
        let raw = serde_json::json!({
            "gameLength": 60000,
            "statsJson": inner,
        })
        .to_string();
        let bytes = ContainerBuilder::new(5).raw_metadata(&raw).build();
        let metadata = decode(&bytes).unwrap();

        assert_eq!(metadata.red_players.len(), 1);
        assert_eq!(metadata.red_players[0]["NAME"], "Escaped");
    }

    #[test]
    fn test_numeric_property_values_become_strings() {
        let raw = serde_json::json!({
            "gameLength": 60000,
            "statsJson": r#"[{"NAME":"Num","TEAM":100,"CHAMPIONS_KILLED":7,"WIN":null}]"#,
        })
        .to_string();
        let bytes = ContainerBuilder::new(5).raw_metadata(&raw).build();
        let metadata = decode(&bytes).unwrap();

        let player = &metadata.blue_players[0];
        assert_eq!(player["TEAM"], "100");
        assert_eq!(player["CHAMPIONS_KILLED"], "7");
        assert!(!player.contains_key("WIN"));
    }
}
