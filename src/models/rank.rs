//! Persisted rank tables.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::StatName;

/// Composite key `"<mode>/<statName>"` identifying one rank table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModeStat(String);

impl ModeStat {
    pub fn new(mode: &str, stat: StatName) -> Self {
        Self(format!("{}/{}", mode, stat.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModeStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A summoner's standing in one rank table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankResult {
    /// 0-indexed position in ascending value order (higher is better)
    pub rank: usize,
    pub total: usize,
    /// `rank / (total - 1)`, or 1.0 for a table of one
    pub percentile: f64,
}

/// Rank table for one mode and stat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankEntry {
    pub mode_stat: ModeStat,

    /// Summoner name to raw stat value
    pub lookup: BTreeMap<String, f64>,

    /// Summoner name to derived rank
    pub ranks: BTreeMap<String, RankResult>,

    pub updated_at: DateTime<Utc>,
}

impl RankEntry {
    /// Rank of one summoner, if they were part of the last rebuild.
    pub fn rank_of(&self, summoner: &str) -> Option<&RankResult> {
        self.ranks.get(summoner)
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }
}
