//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::ranking::DEFAULT_EPSILON;
use crate::storage::StorageConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Rank table settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Values closer than this share a rank
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,

    /// Modes rebuilt when `rebuild` is run without `--mode`. Empty means every
    /// mode in the replay index.
    #[serde(default)]
    pub modes: Vec<String>,
}

fn default_epsilon() -> f64 {
    DEFAULT_EPSILON
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            epsilon: default_epsilon(),
            modes: Vec::new(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub ranking: RankingConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            ranking: RankingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let epsilon = self.ranking.epsilon;
        if !epsilon.is_finite() || epsilon < 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "Ranking epsilon must be a non-negative number, got {}",
                epsilon
            )));
        }

        if let Some(mode) = self.ranking.modes.iter().find(|m| m.trim().is_empty()) {
            return Err(ConfigError::ValidationError(format!(
                "Ranking modes must not be blank, got {:?}",
                mode
            )));
        }

        Ok(())
    }

    pub fn storage(&self) -> StorageConfig {
        StorageConfig::new(self.data_dir.clone())
    }
}
