//! # Replay Ranks
//!
//! Decodes League of Legends replay files, aggregates per-summoner statistics
//! and keeps per-mode percentile rank tables for every tracked stat.
//!
//! ## Architecture
//!
//! - **decode**: Binary replay container parsing into match metadata
//! - **project**: Typed player records from raw property bags
//! - **calculate**: Per-summoner stat aggregation
//! - **ranking**: Rank tables, percentiles and division labels
//! - **storage**: Blob, rank table and JSONL index stores
//! - **library**: Indexed replays as a source of games per mode
//! - **ingest**: Upload, delete and migrate replays
//! - **config**: Configuration loading and validation

pub mod calculate;
pub mod config;
pub mod decode;
pub mod ingest;
pub mod library;
pub mod models;
pub mod project;
pub mod ranking;
pub mod storage;

#[cfg(test)]
mod fixtures;

pub use models::*;
