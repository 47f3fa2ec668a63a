//! services/client/src/config.rs
//!
//! Defines the client's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;
use url::Url;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub api_url: Url,
    pub data_dir: PathBuf,
    pub log_level: Level,
    pub quiz_questions: usize,
    pub request_timeout: Duration,
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
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Backend ---
        let api_url_str =
            lookup("ZYNDLE_API_URL").unwrap_or_else(|| "http://localhost:8000".to_string());
        let api_url = Url::parse(&api_url_str).map_err(|e| {
            ConfigError::InvalidValue("ZYNDLE_API_URL".to_string(), e.to_string())
        })?;
        if api_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidValue(
                "ZYNDLE_API_URL".to_string(),
                format!("'{}' cannot be used as a base URL", api_url_str),
            ));
        }

        let data_dir = lookup("ZYNDLE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./.zyndle"));

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Workspace behavior ---
        let quiz_questions = match lookup("ZYNDLE_QUIZ_QUESTIONS") {
            Some(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|n| (1..=20).contains(n))
                .ok_or_else(|| {
                    ConfigError::InvalidValue(
                        "ZYNDLE_QUIZ_QUESTIONS".to_string(),
                        format!("'{}' is not a number between 1 and 20", raw),
                    )
                })?,
            None => zyndle_core::workflow::DEFAULT_QUIZ_QUESTIONS,
        };

        let request_timeout = match lookup("ZYNDLE_REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or_else(|| {
                    ConfigError::InvalidValue(
                        "ZYNDLE_REQUEST_TIMEOUT_SECS".to_string(),
                        format!("'{}' is not a positive number of seconds", raw),
                    )
                })?,
            None => Duration::from_secs(120),
        };

        Ok(Self {
            api_url,
            data_dir,
            log_level,
            quiz_questions,
            request_timeout,
        })
    }
}
