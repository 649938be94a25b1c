use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tokio::task::JoinSet;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use replay_ranks::calculate::aggregate;
use replay_ranks::config::AppConfig;
use replay_ranks::decode::decode_container;
use replay_ranks::ingest::{delete_replay, ingest_replay, migrate_replays};
use replay_ranks::library::{ReplayIndex, ReplayLibrary};
use replay_ranks::models::{MatchId, StatName};
use replay_ranks::project::extract_all_players;
use replay_ranks::ranking::division::RankDisplay;
use replay_ranks::ranking::RankCache;
use replay_ranks::storage::{FsBlobStore, FsRecordStore, GameSource, StorageConfig};

type Library = ReplayLibrary<FsBlobStore>;
type Cache = RankCache<Library, FsRecordStore>;

#[derive(Parser)]
#[command(name = "replay-ranks")]
#[command(about = "Replay decoder, summoner stats and per-mode rank tables")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: PathBuf,

    /// Data directory path (overrides the config file)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a replay file and print its metadata
    Decode {
        /// Path to the .rofl file
        path: PathBuf,

        /// Print every header table as JSON
        #[arg(long)]
        json: bool,
    },

    /// Store a replay in the library and rebuild its mode's ranks
    Ingest {
        /// Path to the .rofl file
        path: PathBuf,

        /// Game mode the replay is ranked under
        #[arg(long)]
        mode: String,

        /// Date the game was played (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Skip the rank rebuild
        #[arg(long)]
        no_rebuild: bool,
    },

    /// Aggregate one summoner's stats in a mode
    Stats {
        #[arg(long)]
        mode: String,

        #[arg(long)]
        summoner: String,
    },

    /// Rebuild rank tables
    Rebuild {
        /// Modes to rebuild (repeatable). Defaults to the configured modes,
        /// then to every mode in the library.
        #[arg(long)]
        mode: Vec<String>,
    },

    /// Show a summoner's ranks in a mode
    Ranks {
        #[arg(long)]
        mode: String,

        #[arg(long)]
        summoner: String,

        /// Only show these stats (repeatable, e.g. averageKda)
        #[arg(long)]
        stat: Vec<StatName>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Move replays from a legacy replay directory into the library
    Migrate {
        /// Directory holding the replays to move
        #[arg(long)]
        from: PathBuf,
    },

    /// Remove a replay and rebuild its mode's ranks
    Delete {
        match_id: u64,

        /// Skip the rank rebuild
        #[arg(long)]
        no_rebuild: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = if cli.config.exists() {
        AppConfig::from_file(&cli.config)
            .with_context(|| format!("Failed to load {}", cli.config.display()))?
    } else {
        AppConfig::default()
    };
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    let log_level = cli.log_level.unwrap_or_else(|| config.log_level.clone());

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    tracing::info!("Starting replay-ranks v{}", env!("CARGO_PKG_VERSION"));

    let storage = config.storage();

    match cli.command {
        Commands::Decode { path, json } => {
            let bytes = std::fs::read(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let container = decode_container(&bytes)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&container)?);
                return Ok(());
            }

            let metadata = &container.metadata;
            println!("\n=== Match {} ===", metadata.match_id);
            println!("Version:   {}", metadata.game_version);
            println!("Duration:  {:.1} min", metadata.duration_minutes());
            println!("Key:       {}", container.payload_fields.encryption_key);

            let teams = extract_all_players(metadata)?;
            for player in teams.iter() {
                println!(
                    "  [{:?}] {:<20} {:<12} {}/{}/{} {}",
                    player.team,
                    player.summoner_name,
                    player.champion,
                    player.kills,
                    player.deaths,
                    player.assists,
                    if player.win { "W" } else { "L" }
                );
            }
        }

        Commands::Ingest {
            path,
            mode,
            date,
            no_rebuild,
        } => {
            let bytes = std::fs::read(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let date = date.unwrap_or_else(|| chrono::Utc::now().date_naive());

            let cache = open_cache(&storage, &config);
            let record = ingest_replay(cache.source(), &bytes, &mode, date)?;
            println!("Stored match {} in mode {:?}", record.match_id, record.mode);

            if !no_rebuild {
                let summary = cache.rebuild(&mode).await?;
                println!(
                    "Rebuilt {} tables from {} games",
                    summary.tables, summary.games
                );
            }
        }

        Commands::Stats { mode, summoner } => {
            let library = open_library(&storage);
            let games = library.list_games(&mode)?;

            match aggregate(&games, &summoner)? {
                Some(stats) => {
                    println!("\n=== {} in {} ===", stats.summoner, mode);
                    println!("Games:              {}", stats.games);
                    println!(
                        "Record:             {}W {}L ({:.1}%)",
                        stats.wins,
                        stats.losses,
                        stats.winrate * 100.0
                    );
                    println!("KDA:                {}", stats.kda);
                    println!(
                        "Average K/D/A:      {:.1}/{:.1}/{:.1}",
                        stats.average_kills, stats.average_deaths, stats.average_assists
                    );
                    println!("CS per minute:      {:.1}", stats.average_cs_per_minute);
                    println!("Vision score:       {:.1}", stats.average_vision_score);
                    println!(
                        "Damage share:       {:.1}%",
                        stats.average_damage_share * 100.0
                    );
                    println!(
                        "Kill participation: {:.1}%",
                        stats.average_kill_participation * 100.0
                    );
                    println!("Penta kills:        {}", stats.penta_kills);
                }
                None => println!("No games found for {} in {}", summoner, mode),
            }
        }

        Commands::Rebuild { mode } => {
            let cache = open_cache(&storage, &config);
            let modes = if !mode.is_empty() {
                mode
            } else if !config.ranking.modes.is_empty() {
                config.ranking.modes.clone()
            } else {
                cache.source().index().modes()?
            };

            if modes.is_empty() {
                println!("No replays stored; nothing to rebuild");
                return Ok(());
            }

            let mut tasks = JoinSet::new();
            for mode in modes {
                let cache = cache.clone();
                tasks.spawn(async move { cache.rebuild(&mode).await });
            }

            println!("\n=== Rebuild Results ===");
            let mut failed = 0;
            while let Some(joined) = tasks.join_next().await {
                match joined? {
                    Ok(summary) => println!(
                        "  {}: {} games ({} skipped), {} summoners, {} tables",
                        summary.mode,
                        summary.games,
                        summary.skipped_games,
                        summary.summoners,
                        summary.tables
                    ),
                    Err(e) => {
                        tracing::error!("Rebuild failed: {}", e);
                        failed += 1;
                    }
                }
            }
            if failed > 0 {
                anyhow::bail!("{} mode(s) failed to rebuild", failed);
            }
        }

        Commands::Ranks {
            mode,
            summoner,
            stat,
            json,
        } => {
            let cache = open_cache(&storage, &config);
            let ranks = cache.summoner_ranks(&mode, &summoner)?;
            let displays: Vec<RankDisplay> = StatName::ALL
                .iter()
                .filter(|name| stat.is_empty() || stat.contains(name))
                .map(|name| RankDisplay::new(*name, ranks.get(name)))
                .collect();

            if json {
                println!("{}", serde_json::to_string_pretty(&displays)?);
                return Ok(());
            }

            println!("\n=== {} in {} ===", summoner, mode);
            for display in &displays {
                println!(
                    "  {:<26} {:<22} {:<18} {}",
                    display.stat.as_str(),
                    display.division.text,
                    display.heading,
                    display.tooltip
                );
            }
        }

        Commands::Migrate { from } => {
            let library = open_library(&storage);
            let legacy = FsBlobStore::new(from);
            if legacy.same_dir(library.blobs()) {
                anyhow::bail!(
                    "{} is the library's own replay directory; nothing to migrate",
                    legacy.dir().display()
                );
            }
            let report = migrate_replays(&library, &legacy)?;

            println!("\n=== Migration Results ===");
            println!("Moved:   {}", report.moved);
            println!("Skipped: {}", report.skipped);
        }

        Commands::Delete {
            match_id,
            no_rebuild,
        } => {
            let cache = open_cache(&storage, &config);
            let removed = delete_replay(cache.source(), MatchId(match_id))?;
            println!("Deleted match {} from mode {:?}", removed.match_id, removed.mode);

            if !no_rebuild {
                let summary = cache.rebuild(&removed.mode).await?;
                println!(
                    "Rebuilt {} tables from {} games",
                    summary.tables, summary.games
                );
            }
        }
    }

    Ok(())
}

fn open_library(storage: &StorageConfig) -> Library {
    ReplayLibrary::new(
        ReplayIndex::new(storage.replay_index_path()),
        FsBlobStore::new(storage.replays_dir()),
    )
}

fn open_cache(storage: &StorageConfig, config: &AppConfig) -> Arc<Cache> {
    Arc::new(RankCache::with_epsilon(
        open_library(storage),
        FsRecordStore::new(storage.records_dir()),
        config.ranking.epsilon,
    ))
}
