use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_DEBOUNCE_MS: u64 = 300;
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

const APP_DIR: &str = "homebox-local";
const DB_FILE: &str = "homebox.sqlite3";
const HISTORY_FILE: &str = "search-history.json";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a whole number, got {value:?}")]
    NotANumber { var: &'static str, value: String },
    #[error("HOMEBOX_HISTORY_LIMIT must be at least 1")]
    EmptyHistory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    /// Quiet period after the last keystroke before a search runs.
    pub debounce: Duration,
    /// Maximum number of remembered queries.
    pub history_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
    pub history_path: PathBuf,
    pub log_dir: Option<PathBuf>,
    pub search: SearchConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = default_data_dir();
        let db_path = lookup("HOMEBOX_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|| base.join(DB_FILE));
        let history_path = lookup("HOMEBOX_HISTORY")
            .map(PathBuf::from)
            .unwrap_or_else(|| base.join(HISTORY_FILE));
        let log_dir = lookup("HOMEBOX_LOG_DIR").map(PathBuf::from);

        let mut search = SearchConfig::default();
        if let Some(raw) = lookup("HOMEBOX_DEBOUNCE_MS") {
            let ms = parse_number("HOMEBOX_DEBOUNCE_MS", &raw)?;
            search.debounce = Duration::from_millis(ms);
        }
        if let Some(raw) = lookup("HOMEBOX_HISTORY_LIMIT") {
            let limit = parse_number("HOMEBOX_HISTORY_LIMIT", &raw)?;
            if limit == 0 {
                return Err(ConfigError::EmptyHistory);
            }
            search.history_limit = limit as usize;
        }

        Ok(Config {
            db_path,
            history_path,
            log_dir,
            search,
        })
    }
}

fn parse_number(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::NotANumber {
        var,
        value: raw.to_string(),
    })
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
}
