//! Configuration module - environment variable parsing

pub mod arenas;

pub use arenas::{ArenaFile, ArenaSection, ArenaStore, StoreError};

use std::env;
use std::path::PathBuf;

use crate::game::MatchTimings;
use crate::util::time::{COOLDOWN_TICKS, COUNTDOWN_TICKS, DEFAULT_TICK_MILLIS};

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit logs as JSON objects instead of text
    pub log_json: bool,
    /// Path of the persisted arena descriptors
    pub arenas_file: PathBuf,
    /// Wall-clock length of one host tick
    pub tick_millis: u64,
    /// Ticks between match start and combat
    pub countdown_ticks: u64,
    /// Ticks between match end and the next start attempt
    pub cooldown_ticks: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_json: env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            arenas_file: env::var("ARENAS_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("arenas.json")),
            tick_millis: parse_u64("TICK_MILLIS", DEFAULT_TICK_MILLIS)?,
            countdown_ticks: parse_u64("COUNTDOWN_TICKS", COUNTDOWN_TICKS)?,
            cooldown_ticks: parse_u64("COOLDOWN_TICKS", COOLDOWN_TICKS)?,
        })
    }

    pub fn timings(&self) -> MatchTimings {
        MatchTimings {
            countdown_ticks: self.countdown_ticks,
            cooldown_ticks: self.cooldown_ticks,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_json: false,
            arenas_file: PathBuf::from("arenas.json"),
            tick_millis: DEFAULT_TICK_MILLIS,
            countdown_ticks: COUNTDOWN_TICKS,
            cooldown_ticks: COOLDOWN_TICKS,
        }
    }
}

fn parse_u64(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
