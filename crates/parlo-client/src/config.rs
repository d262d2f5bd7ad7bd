//! Configuration for the conversation client.
//!
//! Use the builder methods to customize, or derive a config from
//! resolved [`Settings`].
//!
//! # Example
//!
//! ```
//! use parlo_client::ClientConfig;
//! use std::time::Duration;
//!
//! let config = ClientConfig::new()
//!     .with_base_url("http://192.168.1.20:8000")
//!     .with_poll_interval(Duration::from_millis(1500));
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use parlo_core::Settings;

/// Configuration for the conversation client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the conversation backend, without trailing slash.
    pub(crate) base_url: String,
    /// Static bearer token. `None` means requests go out without an
    /// Authorization header; omission is silent, not an error.
    pub(crate) token: Option<String>,
    /// Path of the upload endpoint under the base URL.
    pub(crate) conversation_path: String,
    /// Wall-clock budget for one upload.
    pub(crate) upload_timeout: Duration,
    /// Per-probe budget; keeps a slow HEAD from stalling the poll cadence.
    pub(crate) probe_timeout: Duration,
    /// Delay between poll ticks.
    pub(crate) poll_interval: Duration,
    /// Wall-clock budget for one poll session.
    pub(crate) poll_timeout: Duration,
    /// After this much elapsed time, reachability alone is accepted in
    /// place of explicit change confirmation. Backends whose metadata
    /// never changes would otherwise hang the loop.
    pub(crate) grace_period: Duration,
    /// Consecutive identical post-change size observations required
    /// before the resource is trusted.
    pub(crate) required_stable_repeats: u8,
    /// Directory for downloaded reply audio.
    pub(crate) cache_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: parlo_core::DEFAULT_API_BASE_URL.to_string(),
            token: None,
            conversation_path: parlo_core::DEFAULT_CONVERSATION_PATH.to_string(),
            upload_timeout: Duration::from_secs(45),
            probe_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(parlo_core::DEFAULT_POLL_INTERVAL_MS),
            poll_timeout: Duration::from_millis(parlo_core::DEFAULT_POLL_TIMEOUT_MS),
            grace_period: Duration::from_secs(8),
            required_stable_repeats: 2,
            cache_dir: env::temp_dir().join("parlo"),
        }
    }
}

impl ClientConfig {
    /// Create a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a configuration from resolved settings.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            base_url: settings.effective_api_base_url(),
            token: settings.api_token.clone(),
            conversation_path: settings.effective_conversation_path(),
            poll_interval: Duration::from_millis(settings.effective_poll_interval_ms()),
            poll_timeout: Duration::from_millis(settings.effective_poll_timeout_ms()),
            cache_dir: settings.effective_cache_dir(),
            ..Self::default()
        }
    }

    /// Set the backend base URL. Trailing slashes are trimmed.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url: String = url.into();
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Set the bearer token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set an optional bearer token.
    #[must_use]
    pub fn with_optional_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// Set the conversation endpoint path. A leading slash is added if
    /// missing.
    #[must_use]
    pub fn with_conversation_path(mut self, path: impl Into<String>) -> Self {
        let path: String = path.into();
        self.conversation_path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };
        self
    }

    /// Set the upload timeout. Defaults to 45 seconds.
    #[must_use]
    pub const fn with_upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout;
        self
    }

    /// Set the per-probe timeout. Defaults to 5 seconds.
    #[must_use]
    pub const fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Set the delay between poll ticks. Defaults to 2 seconds.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the poll budget. Defaults to 60 seconds.
    #[must_use]
    pub const fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Set the grace period after which reachability alone is accepted.
    /// Defaults to 8 seconds.
    #[must_use]
    pub const fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }

    /// Set how many consecutive identical post-change sizes are
    /// required before acceptance. Defaults to 2.
    #[must_use]
    pub const fn with_required_stable_repeats(mut self, repeats: u8) -> Self {
        self.required_stable_repeats = repeats;
        self
    }

    /// Set the cache directory for downloaded reply audio.
    #[must_use]
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    /// The configured base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The configured cache directory.
    #[must_use]
    pub fn cache_dir(&self) -> &PathBuf {
        &self.cache_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ClientConfig::new();
        assert_eq!(config.base_url, parlo_core::DEFAULT_API_BASE_URL);
        assert!(config.token.is_none());
        assert_eq!(config.conversation_path, "/");
        assert_eq!(config.upload_timeout, Duration::from_secs(45));
        assert_eq!(config.probe_timeout, Duration::from_secs(5));
        assert_eq!(config.poll_interval, Duration::from_millis(2000));
        assert_eq!(config.poll_timeout, Duration::from_secs(60));
        assert_eq!(config.grace_period, Duration::from_secs(8));
        assert_eq!(config.required_stable_repeats, 2);
    }

    #[test]
    fn builder_pattern() {
        let config = ClientConfig::new()
            .with_base_url("http://host:9000/")
            .with_token("secret")
            .with_conversation_path("conversation")
            .with_poll_interval(Duration::from_millis(500))
            .with_poll_timeout(Duration::from_secs(10));

        assert_eq!(config.base_url, "http://host:9000");
        assert_eq!(config.token, Some("secret".to_string()));
        assert_eq!(config.conversation_path, "/conversation");
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.poll_timeout, Duration::from_secs(10));
    }

    #[test]
    fn from_settings_applies_effective_values() {
        let settings = Settings {
            api_base_url: Some("http://backend:8000/".to_string()),
            api_token: Some("tok".to_string()),
            conversation_path: Some("talk".to_string()),
            poll_interval_ms: Some(1000),
            poll_timeout_ms: Some(20_000),
            ..Default::default()
        };
        let config = ClientConfig::from_settings(&settings);
        assert_eq!(config.base_url, "http://backend:8000");
        assert_eq!(config.token, Some("tok".to_string()));
        assert_eq!(config.conversation_path, "/talk");
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.poll_timeout, Duration::from_secs(20));
    }
}
