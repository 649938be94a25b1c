//! Summoner statistics and the catalogue of ranked stats.

use serde::{Deserialize, Serialize};

/// Kill/death/assist ratio.
///
/// A summoner who never died has no finite ratio; that case is the
/// `Perfect` sentinel rather than infinity or zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Kda {
    Ratio(f64),
    Perfect,
}

impl Kda {
    /// `(kills + assists) / deaths`, or `Perfect` when deaths is zero.
    pub fn new(kills: u64, deaths: u64, assists: u64) -> Self {
        if deaths == 0 {
            Kda::Perfect
        } else {
            Kda::Ratio((kills as f64 + assists as f64) / deaths as f64)
        }
    }

    /// Value used for ranking. `Perfect` sorts above every finite ratio and
    /// stays representable in JSON.
    pub fn rank_value(&self) -> f64 {
        match self {
            Kda::Ratio(r) => *r,
            Kda::Perfect => f64::MAX,
        }
    }
}

impl std::fmt::Display for Kda {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Kda::Ratio(r) => write!(f, "{:.2}", r),
            Kda::Perfect => write!(f, "Perfect"),
        }
    }
}

/// Aggregate statistics for one summoner within one mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummonerStats {
    /// Name as written in the most recent game folded
    pub summoner: String,

    pub wins: u32,
    pub losses: u32,
    pub games: u32,

    pub kills: u64,
    pub deaths: u64,
    pub assists: u64,
    pub average_kills: f64,
    pub average_deaths: f64,
    pub average_assists: f64,

    /// Wins / games (0.0 to 1.0)
    pub winrate: f64,
    pub kda: Kda,

    pub total_vision_score: u64,
    pub average_vision_score: f64,
    pub penta_kills: u64,

    pub average_cs_per_minute: f64,

    /// Mean of per-game (player damage / team damage)
    pub average_damage_share: f64,

    /// Mean of per-game ((kills + assists) / team kills)
    pub average_kill_participation: f64,
}

/// Stats tracked by the rank cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StatName {
    #[serde(rename = "games")]
    Games,
    #[serde(rename = "winrate")]
    Winrate,
    #[serde(rename = "kda")]
    Kda,
    #[serde(rename = "averageKills")]
    AverageKills,
    #[serde(rename = "averageDeaths")]
    AverageDeaths,
    #[serde(rename = "averageAssists")]
    AverageAssists,
    #[serde(rename = "averageVisionScore")]
    AverageVisionScore,
    #[serde(rename = "averageCsPerMinute")]
    AverageCsPerMinute,
    #[serde(rename = "averageDamageShare")]
    AverageDamageShare,
    #[serde(rename = "averageKillParticipation")]
    AverageKillParticipation,
    #[serde(rename = "wins")]
    Wins,
    #[serde(rename = "losses")]
    Losses,
    #[serde(rename = "pentaKills")]
    PentaKills,
}

impl StatName {
    pub const ALL: [StatName; 13] = [
        StatName::Games,
        StatName::Winrate,
        StatName::Kda,
        StatName::AverageKills,
        StatName::AverageDeaths,
        StatName::AverageAssists,
        StatName::AverageVisionScore,
        StatName::AverageCsPerMinute,
        StatName::AverageDamageShare,
        StatName::AverageKillParticipation,
        StatName::Wins,
        StatName::Losses,
        StatName::PentaKills,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatName::Games => "games",
            StatName::Winrate => "winrate",
            StatName::Kda => "kda",
            StatName::AverageKills => "averageKills",
            StatName::AverageDeaths => "averageDeaths",
            StatName::AverageAssists => "averageAssists",
            StatName::AverageVisionScore => "averageVisionScore",
            StatName::AverageCsPerMinute => "averageCsPerMinute",
            StatName::AverageDamageShare => "averageDamageShare",
            StatName::AverageKillParticipation => "averageKillParticipation",
            StatName::Wins => "wins",
            StatName::Losses => "losses",
            StatName::PentaKills => "pentaKills",
        }
    }

    /// Stats where a lower raw value is better.
    pub fn is_inverse(&self) -> bool {
        matches!(self, StatName::AverageDeaths | StatName::Losses)
    }

    /// Pull this stat's ranking value out of a summoner's aggregate.
    pub fn value(&self, stats: &SummonerStats) -> f64 {
        match self {
            StatName::Games => stats.games as f64,
            StatName::Winrate => stats.winrate,
            StatName::Kda => stats.kda.rank_value(),
            StatName::AverageKills => stats.average_kills,
            StatName::AverageDeaths => stats.average_deaths,
            StatName::AverageAssists => stats.average_assists,
            StatName::AverageVisionScore => stats.average_vision_score,
            StatName::AverageCsPerMinute => stats.average_cs_per_minute,
            StatName::AverageDamageShare => stats.average_damage_share,
            StatName::AverageKillParticipation => stats.average_kill_participation,
            StatName::Wins => stats.wins as f64,
            StatName::Losses => stats.losses as f64,
            StatName::PentaKills => stats.penta_kills as f64,
        }
    }
}

impl std::fmt::Display for StatName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StatName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StatName::ALL
            .into_iter()
            .find(|stat| stat.as_str() == s)
            .ok_or_else(|| format!("unknown stat: {}", s))
    }
}
