//! Projection of raw player property bags into typed [`Player`] records.

use thiserror::Error;

use crate::models::{Metadata, Player, Position, Properties, Team, Teams};

pub const NAME: &str = "NAME";
pub const SKIN: &str = "SKIN";
pub const CHAMPIONS_KILLED: &str = "CHAMPIONS_KILLED";
pub const ASSISTS: &str = "ASSISTS";
pub const NUM_DEATHS: &str = "NUM_DEATHS";
pub const TEAM_POSITION: &str = "TEAM_POSITION";
pub const WIN: &str = "WIN";
pub const TEAM: &str = "TEAM";
pub const VISION_SCORE: &str = "VISION_SCORE";
pub const DOUBLE_KILLS: &str = "DOUBLE_KILLS";
pub const TRIPLE_KILLS: &str = "TRIPLE_KILLS";
pub const QUADRA_KILLS: &str = "QUADRA_KILLS";
pub const PENTA_KILLS: &str = "PENTA_KILLS";
pub const MINIONS_KILLED: &str = "MINIONS_KILLED";
pub const NEUTRAL_MINIONS_KILLED: &str = "NEUTRAL_MINIONS_KILLED";
pub const TOTAL_DAMAGE_DEALT_TO_CHAMPIONS: &str = "TOTAL_DAMAGE_DEALT_TO_CHAMPIONS";

/// Every key a player entry must carry.
pub const REQUIRED_KEYS: [&str; 16] = [
    NAME,
    SKIN,
    CHAMPIONS_KILLED,
    ASSISTS,
    NUM_DEATHS,
    TEAM_POSITION,
    WIN,
    TEAM,
    VISION_SCORE,
    DOUBLE_KILLS,
    TRIPLE_KILLS,
    QUADRA_KILLS,
    PENTA_KILLS,
    MINIONS_KILLED,
    NEUTRAL_MINIONS_KILLED,
    TOTAL_DAMAGE_DEALT_TO_CHAMPIONS,
];

/// Errors raised while projecting a player entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectionError {
    #[error("{0} is undefined")]
    MissingField(&'static str),

    #[error("{field} is not a number: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("TEAM must be 100 or 200, got {0:?}")]
    InvalidTeam(String),
}

fn get<'a>(props: &'a Properties, key: &'static str) -> Result<&'a str, ProjectionError> {
    props
        .get(key)
        .map(String::as_str)
        .ok_or(ProjectionError::MissingField(key))
}

fn number<T: std::str::FromStr>(props: &Properties, key: &'static str) -> Result<T, ProjectionError> {
    let raw = get(props, key)?;
    raw.trim()
        .parse()
        .map_err(|_| ProjectionError::InvalidNumber {
            field: key,
            value: raw.to_string(),
        })
}

/// Build a typed player from one property bag.
pub fn project(props: &Properties) -> Result<Player, ProjectionError> {
    let team_raw = get(props, TEAM)?;
    let team = Team::from_raw(team_raw)
        .ok_or_else(|| ProjectionError::InvalidTeam(team_raw.to_string()))?;

    let minions: u32 = number(props, MINIONS_KILLED)?;
    let neutral: u32 = number(props, NEUTRAL_MINIONS_KILLED)?;
    // Each count fits in u32, their sum may not.
    let cs = u64::from(minions) + u64::from(neutral);

    Ok(Player {
        summoner_name: get(props, NAME)?.to_string(),
        champion: get(props, SKIN)?.to_string(),
        kills: number(props, CHAMPIONS_KILLED)?,
        assists: number(props, ASSISTS)?,
        deaths: number(props, NUM_DEATHS)?,
        position: Position::from_raw(get(props, TEAM_POSITION)?),
        win: get(props, WIN)? == "Win",
        team,
        vision_score: number(props, VISION_SCORE)?,
        double_kills: number(props, DOUBLE_KILLS)?,
        triple_kills: number(props, TRIPLE_KILLS)?,
        quadra_kills: number(props, QUADRA_KILLS)?,
        penta_kills: number(props, PENTA_KILLS)?,
        cs,
        total_damage_to_champions: number(props, TOTAL_DAMAGE_DEALT_TO_CHAMPIONS)?,
    })
}

/// Project both rosters, preserving file order.
/// Any bad entry fails the whole game.
pub fn extract_all_players(metadata: &Metadata) -> Result<Teams, ProjectionError> {
    Ok(Teams {
        blue: metadata
            .blue_players
            .iter()
            .map(project)
            .collect::<Result<_, _>>()?,
        red: metadata
            .red_players
            .iter()
            .map(project)
            .collect::<Result<_, _>>()?,
    })
}

/// First player, blue side first, whose name matches ignoring case and spaces.
pub fn extract_player_by_summoner_name(
    metadata: &Metadata,
    summoner: &str,
) -> Result<Option<Player>, ProjectionError> {
    let teams = extract_all_players(metadata)?;
    Ok(find_player(&teams, summoner).cloned())
}

/// The full roster of the player's side.
pub fn extract_team_from_player(
    metadata: &Metadata,
    player: &Player,
) -> Result<Vec<Player>, ProjectionError> {
    let teams = extract_all_players(metadata)?;
    Ok(teams.side(player.team).to_vec())
}

/// Name lookup over already-projected rosters.
pub fn find_player<'a>(teams: &'a Teams, summoner: &str) -> Option<&'a Player> {
    teams.iter().find(|player| player.matches_name(summoner))
}
