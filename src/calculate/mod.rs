//! Statistics calculation engine.
//!
//! Folds a summoner's games into [`SummonerStats`]:
//! - Win/loss record and per-game averages
//! - KDA with a `Perfect` sentinel for deathless records
//! - Damage share and kill participation as means of per-game ratios

use std::collections::BTreeMap;

use tracing::warn;

use crate::models::{
    canonical_summoner_name, Kda, MatchId, Metadata, Player, SummonerStats, Teams,
};
use crate::project::{extract_all_players, find_player, ProjectionError};
use crate::storage::{Game, ReplayError, StorageError};

/// `numerator / denominator`, or 0.0 when the denominator is zero.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Calculate win rate from wins/losses.
pub fn calculate_win_rate(wins: u32, losses: u32) -> f64 {
    ratio(wins as f64, (wins + losses) as f64)
}

/// A game with both rosters projected.
#[derive(Debug, Clone)]
pub struct PlayedGame {
    pub match_id: MatchId,
    pub duration_minutes: f64,
    pub teams: Teams,
}

impl PlayedGame {
    pub fn from_metadata(metadata: &Metadata) -> Result<Self, ProjectionError> {
        Ok(Self {
            match_id: metadata.match_id,
            duration_minutes: metadata.duration_minutes(),
            teams: extract_all_players(metadata)?,
        })
    }
}

/// Project every game, skipping games with a bad player entry.
pub fn project_games<'a>(games: impl IntoIterator<Item = &'a Metadata>) -> Vec<PlayedGame> {
    games
        .into_iter()
        .filter_map(|metadata| match PlayedGame::from_metadata(metadata) {
            Ok(game) => Some(game),
            Err(e) => {
                warn!("Skipping match {}: {}", metadata.match_id, e);
                None
            }
        })
        .collect()
}

/// Running sums for one summoner.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatTotals {
    pub summoner: String,
    pub wins: u32,
    pub losses: u32,
    pub kills: u64,
    pub deaths: u64,
    pub assists: u64,
    pub total_vision_score: u64,
    pub penta_kills: u64,
    pub total_cs_per_minute: f64,
    pub total_damage_share: f64,
    pub total_kill_participation: f64,
}

impl StatTotals {
    /// Fold one game's line for the summoner.
    pub fn add_game(&mut self, player: &Player, team: &[Player], duration_minutes: f64) {
        let team_damage: f64 = team
            .iter()
            .map(|p| p.total_damage_to_champions as f64)
            .sum();
        let team_kills: u64 = team.iter().map(|p| u64::from(p.kills)).sum();

        self.summoner = player.summoner_name.clone();
        if player.win {
            self.wins += 1;
        } else {
            self.losses += 1;
        }
        self.kills += u64::from(player.kills);
        self.deaths += u64::from(player.deaths);
        self.assists += u64::from(player.assists);
        self.total_vision_score += u64::from(player.vision_score);
        self.penta_kills += u64::from(player.penta_kills);
        self.total_cs_per_minute += ratio(player.cs as f64, duration_minutes);
        self.total_damage_share +=
            ratio(player.total_damage_to_champions as f64, team_damage);
        self.total_kill_participation +=
            ratio(player.kills as f64 + player.assists as f64, team_kills as f64);
    }

    /// Combine two partial folds. `other`'s name wins when it has one.
    pub fn merge(mut self, other: StatTotals) -> StatTotals {
        if !other.summoner.is_empty() {
            self.summoner = other.summoner;
        }
        self.wins += other.wins;
        self.losses += other.losses;
        self.kills += other.kills;
        self.deaths += other.deaths;
        self.assists += other.assists;
        self.total_vision_score += other.total_vision_score;
        self.penta_kills += other.penta_kills;
        self.total_cs_per_minute += other.total_cs_per_minute;
        self.total_damage_share += other.total_damage_share;
        self.total_kill_participation += other.total_kill_participation;
        self
    }

    pub fn games(&self) -> u32 {
        self.wins + self.losses
    }

    /// Derive averages. `None` when no games were folded.
    pub fn finish(self) -> Option<SummonerStats> {
        let games = self.games();
        if games == 0 {
            return None;
        }
        let n = games as f64;

        Some(SummonerStats {
            winrate: calculate_win_rate(self.wins, self.losses),
            kda: Kda::new(self.kills, self.deaths, self.assists),
            average_kills: self.kills as f64 / n,
            average_deaths: self.deaths as f64 / n,
            average_assists: self.assists as f64 / n,
            average_vision_score: self.total_vision_score as f64 / n,
            average_cs_per_minute: self.total_cs_per_minute / n,
            average_damage_share: self.total_damage_share / n,
            average_kill_participation: self.total_kill_participation / n,
            summoner: self.summoner,
            wins: self.wins,
            losses: self.losses,
            games,
            kills: self.kills,
            deaths: self.deaths,
            assists: self.assists,
            total_vision_score: self.total_vision_score,
            penta_kills: self.penta_kills,
        })
    }
}

/// Fold projected games for one summoner. Games without them are skipped.
pub fn summarize(games: &[PlayedGame], summoner: &str) -> Option<SummonerStats> {
    let mut totals = StatTotals::default();

    for game in games {
        let Some(player) = find_player(&game.teams, summoner) else {
            continue;
        };
        let team = game.teams.side(player.team);
        totals.add_game(player, team, game.duration_minutes);
    }

    totals.finish()
}

/// Metadata of every readable game.
#[derive(Debug, Clone, Default)]
pub struct LoadedGames {
    pub metadata: Vec<Metadata>,
    /// Replays that failed to decode
    pub unreadable: usize,
}

/// Load each game's metadata.
///
/// A replay that fails to decode is skipped with a warning. A storage failure
/// stops the load and is returned.
pub fn load_games<G: Game>(games: &[G]) -> Result<LoadedGames, StorageError> {
    let mut loaded = LoadedGames {
        metadata: Vec::with_capacity(games.len()),
        unreadable: 0,
    };
    for game in games {
        match game.load_metadata() {
            Ok(metadata) => loaded.metadata.push(metadata),
            Err(ReplayError::Format(e)) => {
                warn!("Skipping unreadable replay: {}", e);
                loaded.unreadable += 1;
            }
            Err(ReplayError::Storage(e)) => return Err(e),
        }
    }
    Ok(loaded)
}

/// Aggregate a summoner's stats over a set of games.
///
/// Returns `Ok(None)` when the summoner appears in none of them. Unreadable
/// replays and games whose rosters cannot be projected are skipped with a
/// warning; storage failures are returned.
pub fn aggregate<G: Game>(
    games: &[G],
    summoner: &str,
) -> Result<Option<SummonerStats>, StorageError> {
    let loaded = load_games(games)?;
    let played = project_games(&loaded.metadata);
    Ok(summarize(&played, summoner))
}

/// Stats for every summoner that appears in the games, keyed by canonical name.
pub fn aggregate_all(games: &[PlayedGame]) -> BTreeMap<String, SummonerStats> {
    let mut totals: BTreeMap<String, StatTotals> = BTreeMap::new();

    for game in games {
        for side in [&game.teams.blue, &game.teams.red] {
            for player in side.iter() {
                totals
                    .entry(canonical_summoner_name(&player.summoner_name))
                    .or_default()
                    .add_game(player, side, game.duration_minutes);
            }
        }
    }

    totals
        .into_iter()
        .filter_map(|(name, totals)| totals.finish().map(|stats| (name, stats)))
        .collect()
}
