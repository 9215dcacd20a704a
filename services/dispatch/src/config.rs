//! Type-safe service configuration with validation.
//!
//! Loaded from environment variables with `.env` support and validated
//! before the service starts.

use crate::circuit_breaker::CircuitBreakerConfig;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid URL format
    #[error("Invalid URL for {field}: {reason}")]
    InvalidUrl {
        /// Config field holding the URL
        field: String,
        /// Parse failure description
        reason: String,
    },

    /// Invalid duration value
    #[error("Invalid duration for {0}: must be greater than 0")]
    InvalidDuration(String),

    /// Invalid threshold value
    #[error("Invalid threshold for {0}: must be between 0 and 100")]
    InvalidThreshold(String),

    /// Invalid count value
    #[error("Invalid count for {0}: must be at least 1")]
    InvalidCount(String),

    /// Missing required field
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    /// Environment variable parse error
    #[error("Failed to parse environment variable {name}: {reason}")]
    ParseError {
        /// Environment variable name
        name: String,
        /// Parse failure description
        reason: String,
    },
}

/// Service configuration with validation.
#[derive(Debug, Clone)]
pub struct Config {
    /// Redis URL for the shared breaker store and attempt log
    pub redis_url: Url,
    /// Path to the per-tenant breaker config document
    pub tenant_config_path: PathBuf,
    /// Seconds between sampling passes
    pub sample_interval_seconds: u64,
    /// Seconds between config table refreshes
    pub config_refresh_interval_seconds: u64,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
    /// Default breaker cooldown before a retry probe, in seconds
    pub error_timeout_seconds: u64,
    /// Default failure threshold percentage (0-100)
    pub failure_threshold: u32,
    /// Default success threshold percentage (0-100)
    pub success_threshold: u32,
    /// Default minimum attempts before thresholds are evaluated
    pub minimum_request_count: u64,
    /// Default consecutive failed samples that force-open a breaker
    pub consecutive_failure_threshold: u64,
    /// Default observation window in seconds
    pub observability_window_seconds: u64,
    /// Log level filter
    pub log_level: String,
    /// Whether to log in JSON format
    pub log_json: bool,
}

impl Config {
    /// Loads configuration from environment variables with validation.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when a variable fails to parse or a
    /// validated invariant is violated.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = Self {
            redis_url: parse_url_env("REDIS_URL", "redis://localhost:6379")?,
            tenant_config_path: env::var("TENANT_CONFIG_PATH")
                .unwrap_or_else(|_| "/etc/hookline/breaker-configs.json".to_string())
                .into(),
            sample_interval_seconds: parse_env("SAMPLE_INTERVAL", 30)?,
            config_refresh_interval_seconds: parse_env("CONFIG_REFRESH_INTERVAL", 60)?,
            shutdown_timeout_seconds: parse_env("SHUTDOWN_TIMEOUT", 30)?,
            error_timeout_seconds: parse_env("CB_ERROR_TIMEOUT", 30)?,
            failure_threshold: parse_env("CB_FAILURE_THRESHOLD", 70)?,
            success_threshold: parse_env("CB_SUCCESS_THRESHOLD", 90)?,
            minimum_request_count: parse_env("CB_MINIMUM_REQUEST_COUNT", 10)?,
            consecutive_failure_threshold: parse_env("CB_CONSECUTIVE_FAILURE_THRESHOLD", 10)?,
            observability_window_seconds: parse_env("CB_OBSERVABILITY_WINDOW", 300)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_json: parse_env("LOG_JSON", false)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("SAMPLE_INTERVAL", self.sample_interval_seconds),
            (
                "CONFIG_REFRESH_INTERVAL",
                self.config_refresh_interval_seconds,
            ),
            ("CB_ERROR_TIMEOUT", self.error_timeout_seconds),
            ("CB_OBSERVABILITY_WINDOW", self.observability_window_seconds),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidDuration(field.to_string()));
            }
        }

        if self.failure_threshold > 100 {
            return Err(ConfigError::InvalidThreshold("CB_FAILURE_THRESHOLD".to_string()));
        }
        if self.success_threshold > 100 {
            return Err(ConfigError::InvalidThreshold("CB_SUCCESS_THRESHOLD".to_string()));
        }
        if self.minimum_request_count == 0 {
            return Err(ConfigError::InvalidCount("CB_MINIMUM_REQUEST_COUNT".to_string()));
        }
        if self.consecutive_failure_threshold == 0 {
            return Err(ConfigError::InvalidCount(
                "CB_CONSECUTIVE_FAILURE_THRESHOLD".to_string(),
            ));
        }

        Ok(())
    }

    /// The default breaker config applied to tenants without an explicit
    /// one.
    #[must_use]
    pub fn default_breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            sample_rate: Duration::from_secs(self.sample_interval_seconds),
            error_timeout: Duration::from_secs(self.error_timeout_seconds),
            failure_threshold: self.failure_threshold,
            success_threshold: self.success_threshold,
            minimum_request_count: self.minimum_request_count,
            consecutive_failure_threshold: self.consecutive_failure_threshold,
            observability_window: Duration::from_secs(self.observability_window_seconds),
        }
    }

    /// Sampling cadence as a duration.
    #[must_use]
    pub const fn sample_interval(&self) -> Duration {
        Duration::from_secs(self.sample_interval_seconds)
    }

    /// Config refresh cadence as a duration.
    #[must_use]
    pub const fn config_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.config_refresh_interval_seconds)
    }

    /// Graceful shutdown budget as a duration.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_seconds)
    }
}

/// Parse an environment variable with a default value.
fn parse_env<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) => value.parse().map_err(|e: T::Err| ConfigError::ParseError {
            name: name.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

/// Parse a URL environment variable with a default value.
fn parse_url_env(name: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl {
        field: name.to_string(),
        reason: e.to_string(),
    })
}
