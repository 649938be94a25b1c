//! Per-mode rank cache.
//!
//! For every (mode, stat) pair the cache keeps a [`RankEntry`]: summoner to raw
//! value, plus the derived rank and percentile of each summoner. Entries are
//! only ever rebuilt wholesale from the mode's full game set.
//!
//! Rebuilds of one mode are serialised by a per-mode lock. Reads go straight to
//! the record store and never wait on a rebuild. A rebuild that fails while
//! writing puts the previous tables back before returning.

pub mod division;

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::calculate::{aggregate_all, load_games, project_games};
use crate::models::{
    canonical_summoner_name, ModeStat, RankEntry, RankResult, StatName,
};
use crate::storage::{GameSource, RecordStore, StorageError};

/// Values closer than this are tied.
pub const DEFAULT_EPSILON: f64 = 1e-10;

/// Errors from rank cache operations.
#[derive(Debug, Error)]
pub enum RankError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("A rank rebuild for mode {0:?} is already running")]
    RebuildConflict(String),

    #[error("Rebuild task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Percentile of a 0-indexed rank. A table of one is the top percentile.
pub fn percentile(rank: usize, total: usize) -> f64 {
    if total <= 1 {
        1.0
    } else {
        rank as f64 / (total - 1) as f64
    }
}

/// Rank every summoner in a lookup table.
///
/// Entries are sorted ascending by value, ties broken by name. Each entry then
/// scans forward over the values within `epsilon` of its own and takes the
/// index of the last one reached, so a tie group shares the rank of its
/// highest-placed member.
pub fn compute_ranks(
    lookup: &BTreeMap<String, f64>,
    epsilon: f64,
) -> BTreeMap<String, RankResult> {
    let mut sorted: Vec<(&String, f64)> = lookup.iter().map(|(k, v)| (k, *v)).collect();
    sorted.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));

    let total = sorted.len();
    let mut ranks = BTreeMap::new();

    for (i, (name, value)) in sorted.iter().enumerate() {
        let mut highest = i;
        while highest + 1 < total && (sorted[highest + 1].1 - value).abs() < epsilon {
            highest += 1;
        }
        ranks.insert(
            (*name).clone(),
            RankResult {
                rank: highest,
                total,
                percentile: percentile(highest, total),
            },
        );
    }

    ranks
}

/// Build a complete rank table from a lookup.
pub fn build_entry(mode_stat: ModeStat, lookup: BTreeMap<String, f64>, epsilon: f64) -> RankEntry {
    let ranks = compute_ranks(&lookup, epsilon);
    RankEntry {
        mode_stat,
        lookup,
        ranks,
        updated_at: Utc::now(),
    }
}

/// Outcome of one mode rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildSummary {
    pub mode: String,
    pub games: usize,
    pub skipped_games: usize,
    pub summoners: usize,
    pub tables: usize,
}

/// Rank cache over a game source and a record store.
pub struct RankCache<S, R> {
    source: S,
    records: R,
    epsilon: f64,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl<S, R> RankCache<S, R>
where
    S: GameSource,
    R: RecordStore,
{
    pub fn new(source: S, records: R) -> Self {
        Self::with_epsilon(source, records, DEFAULT_EPSILON)
    }

    pub fn with_epsilon(source: S, records: R, epsilon: f64) -> Self {
        Self {
            source,
            records,
            epsilon,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn records(&self) -> &R {
        &self.records
    }

    /// The rebuild lock for one mode.
    pub(crate) fn mode_lock(&self, mode: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(mode.to_string()).or_default().clone()
    }

    /// Rebuild a mode, failing with `RebuildConflict` if one is in flight.
    pub fn try_rebuild(&self, mode: &str) -> Result<RebuildSummary, RankError> {
        let lock = self.mode_lock(mode);
        let _guard = lock
            .try_lock()
            .map_err(|_| RankError::RebuildConflict(mode.to_string()))?;
        self.rebuild_locked(mode)
    }

    fn rebuild_locked(&self, mode: &str) -> Result<RebuildSummary, RankError> {
        info!("Rebuilding ranks for mode {:?}", mode);

        let games = self.source.list_games(mode)?;
        let loaded = load_games(&games)?;
        let played = project_games(&loaded.metadata);
        let skipped = loaded.unreadable + loaded.metadata.len() - played.len();
        let stats = aggregate_all(&played);

        // Build every table before writing any of them.
        let entries: Vec<RankEntry> = StatName::ALL
            .iter()
            .map(|stat| {
                let lookup = stats
                    .iter()
                    .map(|(name, s)| (name.clone(), stat.value(s)))
                    .collect();
                build_entry(ModeStat::new(mode, *stat), lookup, self.epsilon)
            })
            .collect();

        let previous = entries
            .iter()
            .map(|entry| self.records.get(&entry.mode_stat))
            .collect::<Result<Vec<_>, _>>()?;

        for (written, entry) in entries.iter().enumerate() {
            if let Err(e) = self.records.put(&entry.mode_stat, entry) {
                warn!(
                    "Writing {} failed, restoring previous tables for mode {:?}: {}",
                    entry.mode_stat, mode, e
                );
                self.restore(&entries[..=written], &previous[..=written]);
                return Err(e.into());
            }
            debug!("Wrote {} ({} summoners)", entry.mode_stat, entry.len());
        }

        info!(
            "Rebuilt {} rank tables for mode {:?}: {} games, {} summoners",
            entries.len(),
            mode,
            played.len(),
            stats.len()
        );

        Ok(RebuildSummary {
            mode: mode.to_string(),
            games: played.len(),
            skipped_games: skipped,
            summoners: stats.len(),
            tables: entries.len(),
        })
    }

    /// Put back the tables a failed rebuild may have replaced.
    fn restore(&self, written: &[RankEntry], previous: &[Option<RankEntry>]) {
        for (entry, old) in written.iter().zip(previous) {
            let key = &entry.mode_stat;
            let restored = match old {
                Some(old) => self.records.put(key, old),
                None => self.records.delete(key),
            };
            if let Err(e) = restored {
                error!("Failed to restore rank table {}: {}", key, e);
            }
        }
    }

    /// One summoner's rank for one stat. `None` if the table was never built
    /// or the summoner was not in it.
    pub fn rank(
        &self,
        mode: &str,
        stat: StatName,
        summoner: &str,
    ) -> Result<Option<RankResult>, RankError> {
        let entry = self.records.get(&ModeStat::new(mode, stat))?;
        Ok(entry.and_then(|e| e.rank_of(&canonical_summoner_name(summoner)).copied()))
    }

    /// Every stat the summoner is ranked in for a mode.
    pub fn summoner_ranks(
        &self,
        mode: &str,
        summoner: &str,
    ) -> Result<BTreeMap<StatName, RankResult>, RankError> {
        let mut ranks = BTreeMap::new();
        for stat in StatName::ALL {
            if let Some(result) = self.rank(mode, stat, summoner)? {
                ranks.insert(stat, result);
            }
        }
        Ok(ranks)
    }
}

impl<S, R> RankCache<S, R>
where
    S: GameSource + 'static,
    R: RecordStore + 'static,
{
    /// Rebuild every tracked stat for a mode, waiting for any rebuild of the
    /// same mode that is already running. The work runs on the blocking pool.
    pub async fn rebuild(self: &Arc<Self>, mode: &str) -> Result<RebuildSummary, RankError> {
        let guard = self.mode_lock(mode).lock_owned().await;
        let cache = Arc::clone(self);
        let mode = mode.to_string();

        tokio::task::spawn_blocking(move || {
            let _guard = guard;
            cache.rebuild_locked(&mode)
        })
        .await?
    }
}
