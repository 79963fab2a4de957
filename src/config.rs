//! # Configuration Module
//!
//! This module defines the runtime configuration of the recipes bot: channel
//! credentials, remote endpoints, recovery settings for outbound calls and
//! session lifetime. Values come from the environment (a `.env` file is
//! loaded by `main`) and fall back to the defaults below.

use anyhow::{anyhow, Context, Result};
use std::env;
use std::time::Duration;

// Defaults for the remote services
pub const DEFAULT_LANGUAGE: &str = "ru";
pub const DEFAULT_MEALDB_BASE_URL: &str = "https://www.themealdb.com/api/json/v1/1";
pub const DEFAULT_TRANSLATION_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_LOOKUP_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_SESSION_TTL_SECS: u64 = 30 * 60; // 30 minutes of inactivity
pub const DEFAULT_SESSION_SWEEP_SECS: u64 = 5 * 60;

/// Recovery configuration for calls to the recipe directory
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryConfig {
    /// Maximum number of retry attempts after the first call
    pub max_retries: u32,
    /// Base delay between retries in milliseconds
    pub base_retry_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_retry_delay_ms: u64,
    /// Circuit breaker failure threshold
    pub circuit_breaker_threshold: u32,
    /// Circuit breaker reset timeout in seconds
    pub circuit_breaker_reset_secs: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_retry_delay_ms: 250,
            max_retry_delay_ms: 4000, // 4 seconds
            circuit_breaker_threshold: 5,
            circuit_breaker_reset_secs: 60, // 1 minute
        }
    }
}

/// Settings for the recipe directory client
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub recovery: RecoveryConfig,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_MEALDB_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            recovery: RecoveryConfig::default(),
        }
    }
}

/// Settings for the translation client
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationConfig {
    /// When false, texts are passed through untranslated
    pub enabled: bool,
    pub endpoint: String,
    pub request_timeout_secs: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: DEFAULT_TRANSLATION_ENDPOINT.to_string(),
            request_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

/// Settings for the interaction flow and its session store
#[derive(Debug, Clone, PartialEq)]
pub struct FlowConfig {
    /// Language of user-facing text and translation target
    pub language: String,
    /// Upper bound for a single recipe lookup in the detail fan-out
    pub lookup_timeout_secs: u64,
    /// Idle time after which a conversation session is discarded
    pub session_ttl_secs: u64,
    /// Period of the background purge of expired sessions
    pub session_sweep_secs: u64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            lookup_timeout_secs: DEFAULT_LOOKUP_TIMEOUT_SECS,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            session_sweep_secs: DEFAULT_SESSION_SWEEP_SECS,
        }
    }
}

impl FlowConfig {
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn session_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session_sweep_secs)
    }
}

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub telegram_bot_token: String,
    pub directory: DirectoryConfig,
    pub translation: TranslationConfig,
    pub flow: FlowConfig,
}

impl AppConfig {
    /// Read the configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    ///
    /// Only `TELEGRAM_BOT_TOKEN` is required; every other key falls back to
    /// its default when absent or blank.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let telegram_bot_token =
            get("TELEGRAM_BOT_TOKEN").ok_or_else(|| anyhow!("TELEGRAM_BOT_TOKEN must be set"))?;

        let http_timeout = parse_or(&get, "HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?;
        let recovery_defaults = RecoveryConfig::default();
        let recovery = RecoveryConfig {
            max_retries: parse_or(&get, "HTTP_MAX_RETRIES", recovery_defaults.max_retries)?,
            base_retry_delay_ms: parse_or(
                &get,
                "HTTP_RETRY_BASE_DELAY_MS",
                recovery_defaults.base_retry_delay_ms,
            )?,
            max_retry_delay_ms: parse_or(
                &get,
                "HTTP_RETRY_MAX_DELAY_MS",
                recovery_defaults.max_retry_delay_ms,
            )?,
            circuit_breaker_threshold: parse_or(
                &get,
                "CIRCUIT_BREAKER_THRESHOLD",
                recovery_defaults.circuit_breaker_threshold,
            )?,
            circuit_breaker_reset_secs: parse_or(
                &get,
                "CIRCUIT_BREAKER_RESET_SECS",
                recovery_defaults.circuit_breaker_reset_secs,
            )?,
        };

        let directory = DirectoryConfig {
            base_url: get("MEALDB_BASE_URL")
                .unwrap_or_else(|| DEFAULT_MEALDB_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            request_timeout_secs: http_timeout,
            recovery,
        };

        let translation = TranslationConfig {
            enabled: parse_or(&get, "TRANSLATION_ENABLED", true)?,
            endpoint: get("TRANSLATION_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_TRANSLATION_ENDPOINT.to_string()),
            request_timeout_secs: http_timeout,
        };

        let flow = FlowConfig {
            language: get("BOT_LANGUAGE")
                .map(|lang| lang.to_lowercase())
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            lookup_timeout_secs: parse_or(&get, "LOOKUP_TIMEOUT_SECS", DEFAULT_LOOKUP_TIMEOUT_SECS)?,
            session_ttl_secs: parse_or(&get, "SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS)?,
            session_sweep_secs: parse_or(&get, "SESSION_SWEEP_SECS", DEFAULT_SESSION_SWEEP_SECS)?,
        };

        if flow.session_sweep_secs == 0 {
            return Err(anyhow!("SESSION_SWEEP_SECS must be greater than zero"));
        }

        Ok(Self {
            telegram_bot_token,
            directory,
            translation,
            flow,
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Invalid value for {key}: '{raw}'")),
        None => Ok(default),
    }
}
