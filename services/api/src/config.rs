//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use flashcard_core::study::MISMATCH_CLEAR_DELAY;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub store_path: PathBuf,
    pub log_level: Level,
    pub openai_api_key: Option<String>,
    pub generation_model: String,
    pub default_max_cards: usize,
    pub max_cards_limit: usize,
    pub mismatch_clear_delay: Duration,
    pub cors_origin: String,
}

/// Reads `name`, parsing it when present and falling back to `default` otherwise.
fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Server and Store Settings ---
        let bind_address = parse_var("BIND_ADDRESS", SocketAddr::from(([0, 0, 0, 0], 3000)))?;
        let store_path = std::env::var("STORE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./flashcards.json"));

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Generation Settings ---
        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        let generation_model =
            std::env::var("GENERATION_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        let max_cards_limit = parse_var("MAX_CARDS_LIMIT", 100usize)?;
        if max_cards_limit == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_CARDS_LIMIT".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let default_max_cards = parse_var("DEFAULT_MAX_CARDS", 10usize)?.clamp(1, max_cards_limit);

        // --- Study Settings ---
        let default_delay_ms = MISMATCH_CLEAR_DELAY.as_millis() as u64;
        let mismatch_clear_delay = Duration::from_millis(parse_var("MISMATCH_CLEAR_MS", default_delay_ms)?);
        let cors_origin =
            std::env::var("CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string());

        Ok(Self {
            bind_address,
            store_path,
            log_level,
            openai_api_key,
            generation_model,
            default_max_cards,
            max_cards_limit,
            mismatch_clear_delay,
            cors_origin,
        })
    }

    /// Clamps a requested card count into `1..=max_cards_limit`.
    pub fn clamp_max_cards(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_max_cards)
            .clamp(1, self.max_cards_limit)
    }
}

/// A fixed configuration for unit tests.
#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        bind_address: SocketAddr::from(([127, 0, 0, 1], 0)),
        store_path: PathBuf::from("unused.json"),
        log_level: Level::INFO,
        openai_api_key: None,
        generation_model: "test-model".to_string(),
        default_max_cards: 10,
        max_cards_limit: 100,
        mismatch_clear_delay: Duration::from_millis(20),
        cors_origin: "http://localhost:3000".to_string(),
    }
}
