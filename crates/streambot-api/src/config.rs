//! Server configuration read from the environment.

use std::path::PathBuf;
use std::time::Duration;

use streambot_core::settings::{Multiplier, RoundSettings};

use crate::error::AppError;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_STORIES_PATH: &str = "stories/adventures.yaml";
const DEFAULT_JOIN_TIMEOUT_MS: u64 = 60_000;
const DEFAULT_WIN_MULTIPLIER: f64 = 1.5;
const DEFAULT_COOLDOWN_MS: u64 = 300_000;

/// Everything the server needs at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `PostgreSQL` connection string.
    pub database_url: String,
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// YAML file holding the story catalog.
    pub stories_path: PathBuf,
    /// Initial adventure settings.
    pub round_settings: RoundSettings,
}

impl AppConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing or a value
    /// cannot be parsed.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let database_url = lookup("DATABASE_URL").ok_or_else(|| {
            AppError::Config("DATABASE_URL environment variable must be set".to_string())
        })?;
        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_or(&lookup, "PORT", DEFAULT_PORT)?;
        let stories_path = lookup("STORIES_PATH")
            .map_or_else(|| PathBuf::from(DEFAULT_STORIES_PATH), PathBuf::from);

        let join_timeout_ms = parse_or(&lookup, "ADVENTURE_JOIN_TIMEOUT_MS", DEFAULT_JOIN_TIMEOUT_MS)?;
        let win_multiplier = parse_or(&lookup, "ADVENTURE_WIN_MULTIPLIER", DEFAULT_WIN_MULTIPLIER)?;
        let cooldown_ms = parse_or(&lookup, "ADVENTURE_COOLDOWN_MS", DEFAULT_COOLDOWN_MS)?;

        let round_settings = RoundSettings {
            join_timeout: Duration::from_millis(join_timeout_ms),
            win_multiplier: Multiplier::from_ratio(win_multiplier)
                .map_err(|e| AppError::Config(format!("ADVENTURE_WIN_MULTIPLIER: {e}")))?,
            cooldown: Duration::from_millis(cooldown_ms),
        };

        Ok(Self {
            database_url,
            host,
            port,
            stories_path,
            round_settings,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{key} is invalid: {e}"))),
        None => Ok(default),
    }
}
