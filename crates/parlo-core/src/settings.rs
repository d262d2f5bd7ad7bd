//! Client settings and validation.
//!
//! Settings fields are optional so callers can override only what they
//! need. Resolution precedence is documented per field: explicit value
//! set by the caller > environment variable > hardcoded default. The
//! environment is consulted through [`Settings::from_env`]; the CLI
//! loads a `.env` file first so packaged configuration participates in
//! the same chain.

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default conversation API base URL.
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";

/// Default conversation endpoint path.
pub const DEFAULT_CONVERSATION_PATH: &str = "/";

/// Default interval between readiness probes, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

/// Default poll budget, in milliseconds.
pub const DEFAULT_POLL_TIMEOUT_MS: u64 = 60_000;

/// Environment variables recognized by [`Settings::from_env`].
pub const ENV_API_BASE_URL: &str = "PARLO_API_BASE_URL";
pub const ENV_API_TOKEN: &str = "PARLO_API_TOKEN";
pub const ENV_CONVERSATION_PATH: &str = "PARLO_CONVERSATION_PATH";
pub const ENV_POLL_INTERVAL_MS: &str = "PARLO_POLL_INTERVAL_MS";
pub const ENV_POLL_TIMEOUT_MS: &str = "PARLO_POLL_TIMEOUT_MS";
pub const ENV_CACHE_DIR: &str = "PARLO_CACHE_DIR";
pub const ENV_HISTORY_PATH: &str = "PARLO_HISTORY_PATH";

/// Application settings.
///
/// All fields are optional to support partial overrides and graceful
/// defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the conversation backend.
    pub api_base_url: Option<String>,

    /// Static bearer token attached to every request. No refresh or
    /// rotation; absence means requests go out unauthenticated.
    pub api_token: Option<String>,

    /// Path of the conversation upload endpoint under the base URL.
    pub conversation_path: Option<String>,

    /// Interval between readiness probes in milliseconds.
    pub poll_interval_ms: Option<u64>,

    /// Poll budget in milliseconds.
    pub poll_timeout_ms: Option<u64>,

    /// Directory for downloaded reply audio files.
    pub cache_dir: Option<PathBuf>,

    /// Path of the conversation history file.
    pub history_path: Option<PathBuf>,
}

impl Settings {
    /// Read settings from the environment.
    ///
    /// Unset variables stay `None`; numeric variables that fail to
    /// parse are treated as unset.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            api_base_url: env_string(ENV_API_BASE_URL),
            api_token: env_string(ENV_API_TOKEN),
            conversation_path: env_string(ENV_CONVERSATION_PATH),
            poll_interval_ms: env_u64(ENV_POLL_INTERVAL_MS),
            poll_timeout_ms: env_u64(ENV_POLL_TIMEOUT_MS),
            cache_dir: env_string(ENV_CACHE_DIR).map(PathBuf::from),
            history_path: env_string(ENV_HISTORY_PATH).map(PathBuf::from),
        }
    }

    /// Fill unset fields from `fallback`, keeping explicit values.
    #[must_use]
    pub fn or(mut self, fallback: Self) -> Self {
        self.api_base_url = self.api_base_url.or(fallback.api_base_url);
        self.api_token = self.api_token.or(fallback.api_token);
        self.conversation_path = self.conversation_path.or(fallback.conversation_path);
        self.poll_interval_ms = self.poll_interval_ms.or(fallback.poll_interval_ms);
        self.poll_timeout_ms = self.poll_timeout_ms.or(fallback.poll_timeout_ms);
        self.cache_dir = self.cache_dir.or(fallback.cache_dir);
        self.history_path = self.history_path.or(fallback.history_path);
        self
    }

    /// Effective base URL, with trailing slashes trimmed.
    #[must_use]
    pub fn effective_api_base_url(&self) -> String {
        self.api_base_url
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE_URL)
            .trim_end_matches('/')
            .to_string()
    }

    /// Effective conversation path, guaranteed to carry a leading slash.
    #[must_use]
    pub fn effective_conversation_path(&self) -> String {
        let raw = self
            .conversation_path
            .as_deref()
            .unwrap_or(DEFAULT_CONVERSATION_PATH);
        if raw.starts_with('/') {
            raw.to_string()
        } else {
            format!("/{raw}")
        }
    }

    /// Effective poll interval (with default fallback).
    #[must_use]
    pub const fn effective_poll_interval_ms(&self) -> u64 {
        match self.poll_interval_ms {
            Some(ms) => ms,
            None => DEFAULT_POLL_INTERVAL_MS,
        }
    }

    /// Effective poll timeout (with default fallback).
    #[must_use]
    pub const fn effective_poll_timeout_ms(&self) -> u64 {
        match self.poll_timeout_ms {
            Some(ms) => ms,
            None => DEFAULT_POLL_TIMEOUT_MS,
        }
    }

    /// Effective cache directory for downloaded reply audio.
    #[must_use]
    pub fn effective_cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| env::temp_dir().join("parlo"))
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_u64(key: &str) -> Option<u64> {
    env_string(key).and_then(|v| v.parse().ok())
}

/// Settings validation error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SettingsError {
    #[error("API base URL cannot be empty")]
    EmptyBaseUrl,

    #[error("Poll interval must be at least 100 ms, got {0}")]
    PollIntervalTooShort(u64),

    #[error("Poll timeout ({timeout_ms} ms) must be at least one poll interval ({interval_ms} ms)")]
    PollTimeoutTooShort { timeout_ms: u64, interval_ms: u64 },
}

/// Validate settings values.
pub fn validate_settings(settings: &Settings) -> Result<(), SettingsError> {
    if settings
        .api_base_url
        .as_ref()
        .is_some_and(|u| u.trim().is_empty())
    {
        return Err(SettingsError::EmptyBaseUrl);
    }

    let interval = settings.effective_poll_interval_ms();
    if interval < 100 {
        return Err(SettingsError::PollIntervalTooShort(interval));
    }

    let timeout = settings.effective_poll_timeout_ms();
    if timeout < interval {
        return Err(SettingsError::PollTimeoutTooShort {
            timeout_ms: timeout,
            interval_ms: interval,
        });
    }

    Ok(())
}
