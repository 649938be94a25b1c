//! Builders for synthetic replays used across the test suites.

use serde_json::{json, Map, Value};

use crate::decode::{LENGTH_FIELDS_OFFSET, LENGTH_FIELDS_SIZE, MAGIC};
use crate::models::{MatchId, Metadata, Properties};

/// Property bag for one player with every required key filled in.
#[derive(Clone)]
pub struct PlayerProps {
    props: Properties,
}

impl PlayerProps {
    pub fn new(name: &str, team: &str) -> Self {
        let mut props = Properties::new();
        for (key, value) in [
            ("NAME", name),
            ("SKIN", "Ahri"),
            ("CHAMPIONS_KILLED", "0"),
            ("ASSISTS", "0"),
            ("NUM_DEATHS", "0"),
            ("TEAM_POSITION", "MIDDLE"),
            ("WIN", "Fail"),
            ("TEAM", team),
            ("VISION_SCORE", "0"),
            ("DOUBLE_KILLS", "0"),
            ("TRIPLE_KILLS", "0"),
            ("QUADRA_KILLS", "0"),
            ("PENTA_KILLS", "0"),
            ("MINIONS_KILLED", "0"),
            ("NEUTRAL_MINIONS_KILLED", "0"),
            ("TOTAL_DAMAGE_DEALT_TO_CHAMPIONS", "0"),
        ] {
            props.insert(key.to_string(), value.to_string());
        }
        Self { props }
    }

    pub fn set(mut self, key: &str, value: impl ToString) -> Self {
        self.props.insert(key.to_string(), value.to_string());
        self
    }

    pub fn champion(self, champion: &str) -> Self {
        self.set("SKIN", champion)
    }

    pub fn kda(self, kills: u32, deaths: u32, assists: u32) -> Self {
        self.set("CHAMPIONS_KILLED", kills)
            .set("NUM_DEATHS", deaths)
            .set("ASSISTS", assists)
    }

    pub fn win(self, win: bool) -> Self {
        self.set("WIN", if win { "Win" } else { "Fail" })
    }

    pub fn damage(self, damage: u64) -> Self {
        self.set("TOTAL_DAMAGE_DEALT_TO_CHAMPIONS", damage)
    }

    pub fn cs(self, minions: u32, neutral: u32) -> Self {
        self.set("MINIONS_KILLED", minions)
            .set("NEUTRAL_MINIONS_KILLED", neutral)
    }

    pub fn build(self) -> Properties {
        self.props
    }
}

/// Metadata for a game built directly, without going through bytes.
pub fn metadata(match_id: u64, duration_ms: u64, players: Vec<Properties>) -> Metadata {
    let (blue_players, red_players) = players
        .into_iter()
        .partition(|p| p.get("TEAM").map(String::as_str) == Some("100"));
    Metadata {
        match_id: MatchId(match_id),
        game_duration: duration_ms,
        game_version: "10.4.308.9999".to_string(),
        last_game_chunk_id: 28,
        last_key_frame_id: 14,
        blue_players,
        red_players,
    }
}

/// Byte-level replay writer.
pub struct ContainerBuilder {
    match_id: u64,
    game_length: u64,
    encryption_key: String,
    players: Vec<Properties>,
    extra: Map<String, Value>,
    raw_metadata: Option<String>,
}

impl ContainerBuilder {
    pub fn new(match_id: u64) -> Self {
        Self {
            match_id,
            game_length: 1_800_000,
            encryption_key: "dGVzdC1rZXk=".to_string(),
            players: Vec::new(),
            extra: Map::new(),
            raw_metadata: None,
        }
    }

    pub fn player(mut self, props: Properties) -> Self {
        self.players.push(props);
        self
    }

    pub fn game_length(mut self, ms: u64) -> Self {
        self.game_length = ms;
        self
    }

    pub fn encryption_key(mut self, key: &str) -> Self {
        self.encryption_key = key.to_string();
        self
    }

    pub fn extra_metadata(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    /// Replace the whole metadata JSON block.
    pub fn raw_metadata(mut self, raw: &str) -> Self {
        self.raw_metadata = Some(raw.to_string());
        self
    }

    fn metadata_json(&self) -> String {
        if let Some(raw) = &self.raw_metadata {
            return raw.clone();
        }
        let stats_json = serde_json::to_string(&self.players).expect("players serialize");
        let mut block = json!({
            "gameLength": self.game_length,
            "gameVersion": "10.4.308.9999",
            "lastGameChunkId": 28,
            "lastKeyFrameId": 14,
            "statsJson": stats_json,
        });
        if let Value::Object(map) = &mut block {
            map.extend(self.extra.clone());
        }
        block.to_string()
    }

    pub fn build(&self) -> Vec<u8> {
        let metadata = self.metadata_json().into_bytes();
        let key = self.encryption_key.as_bytes();

        let header_length = LENGTH_FIELDS_OFFSET + LENGTH_FIELDS_SIZE;
        let metadata_offset = header_length;
        let payload_header_offset = metadata_offset + metadata.len();
        let payload_header_length = 34 + key.len();
        let payload_offset = payload_header_offset + payload_header_length;
        let file_length = payload_offset;

        let mut bytes = vec![0u8; header_length];
        bytes[..4].copy_from_slice(&MAGIC);

        let mut table = Vec::with_capacity(LENGTH_FIELDS_SIZE);
        table.extend_from_slice(&(header_length as u16).to_le_bytes());
        for field in [
            file_length,
            metadata_offset,
            metadata.len(),
            payload_header_offset,
            payload_header_length,
            payload_offset,
        ] {
            table.extend_from_slice(&(field as u32).to_le_bytes());
        }
        bytes[LENGTH_FIELDS_OFFSET..header_length].copy_from_slice(&table);

        bytes.extend_from_slice(&metadata);

        bytes.extend_from_slice(&self.match_id.to_le_bytes());
        bytes.extend_from_slice(&(self.game_length as u32).to_le_bytes());
        for field in [15u32, 29, 29, 1, 60_000] {
            bytes.extend_from_slice(&field.to_le_bytes());
        }
        bytes.extend_from_slice(&(key.len() as u16).to_le_bytes());
        bytes.extend_from_slice(key);

        bytes
    }
}
