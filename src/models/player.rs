//! Typed per-player record projected from a replay.

use serde::{Deserialize, Serialize};

/// Lane assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    Top,
    Jungle,
    Mid,
    Bot,
    Support,
    Other,
}

impl Position {
    /// Map a raw `TEAM_POSITION` value. Anything unrecognised is `Other`.
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "TOP" => Position::Top,
            "JUNGLE" => Position::Jungle,
            "MIDDLE" => Position::Mid,
            "BOTTOM" => Position::Bot,
            "UTILITY" => Position::Support,
            _ => Position::Other,
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Position::Top => write!(f, "Top"),
            Position::Jungle => write!(f, "Jungle"),
            Position::Mid => write!(f, "Mid"),
            Position::Bot => write!(f, "Bot"),
            Position::Support => write!(f, "Support"),
            Position::Other => write!(f, "Other"),
        }
    }
}

/// Map side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Blue,
    Red,
}

impl Team {
    /// Map a raw `TEAM` value ("100" or "200").
    pub fn from_raw(raw: &str) -> Option<Self> {
        match raw {
            "100" => Some(Team::Blue),
            "200" => Some(Team::Red),
            _ => None,
        }
    }
}

/// One player's line in a finished game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub summoner_name: String,
    pub champion: String,
    pub kills: u32,
    pub assists: u32,
    pub deaths: u32,
    pub position: Position,
    pub win: bool,
    pub team: Team,
    pub vision_score: u32,
    pub double_kills: u32,
    pub triple_kills: u32,
    pub quadra_kills: u32,
    pub penta_kills: u32,

    /// Lane minions plus neutral monsters
    pub cs: u64,

    pub total_damage_to_champions: u64,
}

impl Player {
    /// Whether this player answers to the given summoner name.
    /// Comparison ignores case and spaces.
    pub fn matches_name(&self, summoner: &str) -> bool {
        canonical_summoner_name(&self.summoner_name) == canonical_summoner_name(summoner)
    }
}

/// Lowercase a summoner name and strip spaces.
pub fn canonical_summoner_name(name: &str) -> String {
    name.chars()
        .filter(|c| *c != ' ')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Both rosters of a game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Teams {
    pub blue: Vec<Player>,
    pub red: Vec<Player>,
}

impl Teams {
    /// Roster for one side.
    pub fn side(&self, team: Team) -> &[Player] {
        match team {
            Team::Blue => &self.blue,
            Team::Red => &self.red,
        }
    }

    /// All players, blue side first.
    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.blue.iter().chain(self.red.iter())
    }
}
