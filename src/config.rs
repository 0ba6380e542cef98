//! Configuration file parser for the ingestion daemon.
//!
//! The config file is optional: a missing file yields `Config::default()`
//! (no sources, so nothing to ingest). Unknown keys are accepted but logged,
//! since they are usually typos.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::feed::FetchPolicy;
use crate::storage::SourceConfig;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// SEC-014: Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid source configuration: {0}")]
    InvalidSource(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database file.
    pub database_path: PathBuf,

    /// Minutes between ingestion cycles. 0 = run once and exit.
    pub refresh_interval_minutes: u64,

    /// Per-request timeout for feed fetches.
    pub request_timeout_secs: u64,

    /// Retries for rate-limited, 5xx and truncated responses.
    pub max_retries: u32,

    /// Backoff before the first retry; doubles on each further retry.
    pub retry_base_delay_ms: u64,

    /// How many distinct sources may be ingested at the same time.
    pub max_concurrent_sources: usize,

    /// User-Agent sent with feed requests.
    pub user_agent: String,

    /// Feed origins, synced into the database on startup.
    pub sources: Vec<SourceEntry>,
}

/// One `[[sources]]` table.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SourceEntry {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub hook: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("news.db"),
            refresh_interval_minutes: 0,
            request_timeout_secs: 30,
            max_retries: 3,
            retry_base_delay_ms: 2000,
            max_concurrent_sources: 4,
            user_agent: concat!("newsfeed-ingest/", env!("CARGO_PKG_VERSION")).to_string(),
            sources: Vec::new(),
        }
    }
}

impl Config {
    /// SEC-014: Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 8] = [
        "database_path",
        "refresh_interval_minutes",
        "request_timeout_secs",
        "max_retries",
        "retry_base_delay_ms",
        "max_concurrent_sources",
        "user_agent",
        "sources",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Duplicate source ids → `Err(ConfigError::InvalidSource)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        config.validate()?;
        tracing::info!(sources = config.sources.len(), "Loaded configuration");
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = std::collections::HashSet::new();
        for source in &self.sources {
            if !seen.insert(source.id) {
                return Err(ConfigError::InvalidSource(format!(
                    "duplicate source id {}",
                    source.id
                )));
            }
        }
        Ok(())
    }

    pub fn fetch_policy(&self) -> FetchPolicy {
        FetchPolicy {
            timeout: Duration::from_secs(self.request_timeout_secs),
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
        }
    }

    /// Sources in the shape the store syncs. Blank URLs and hooks become `None`.
    pub fn source_configs(&self) -> Vec<SourceConfig> {
        self.sources
            .iter()
            .map(|s| SourceConfig {
                id: s.id,
                title: s.title.clone(),
                url: s.url.clone().filter(|u| !u.trim().is_empty()),
                hook: s.hook.clone().filter(|h| !h.trim().is_empty()),
            })
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
