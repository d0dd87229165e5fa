//! Runtime configuration.
//!
//! Read from `$FOLIO_CONFIG`, or `~/.folio/config.toml` when unset. Every key
//! is optional. `FOLIO_HOLDINGS_FILE` and `FOLIO_SNAPSHOTS_FILE` override the
//! file locations after the TOML is applied.

use crate::prices::{Lookback, DEFAULT_LOOKBACK_DAYS};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_ENV: &str = "FOLIO_CONFIG";
const HOLDINGS_ENV: &str = "FOLIO_HOLDINGS_FILE";
const SNAPSHOTS_ENV: &str = "FOLIO_SNAPSHOTS_FILE";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Holdings JSON file
    pub holdings_file: PathBuf,
    /// Snapshot history (JSON Lines)
    pub snapshots_file: PathBuf,
    /// Trailing window for risk statistics, in calendar days
    pub lookback_days: u32,
}

impl Default for Config {
    fn default() -> Self {
        let dir = data_dir();
        Self {
            holdings_file: dir.join("holdings.json"),
            snapshots_file: dir.join("snapshots.jsonl"),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
        }
    }
}

impl Config {
    /// Load from the default location and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_path(&Self::default_path())?;
        config.apply_env();
        Ok(config)
    }

    /// Load from a specific TOML file. A missing file yields the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Config file location.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = env::var(CONFIG_ENV) {
            return PathBuf::from(path);
        }
        data_dir().join("config.toml")
    }

    fn apply_env(&mut self) {
        if let Ok(path) = env::var(HOLDINGS_ENV) {
            self.holdings_file = PathBuf::from(path);
        }
        if let Ok(path) = env::var(SNAPSHOTS_ENV) {
            self.snapshots_file = PathBuf::from(path);
        }
    }

    pub fn lookback(&self) -> Lookback {
        Lookback::days(self.lookback_days)
    }
}

fn data_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".folio"))
        .unwrap_or_else(|| PathBuf::from("."))
}
