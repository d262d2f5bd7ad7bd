//! URL construction helpers.
//!
//! Pure functions for resolving reply-audio URLs against the
//! configured backend and for defeating intermediary caches with
//! unique query parameters.

use chrono::Utc;
use uuid::Uuid;

use crate::config::ClientConfig;

/// Query key appended by the materializer as a last line of defense
/// against identity-based caching layers.
const CACHE_BUST_KEY: &str = "cacheBust";

/// Resolve a reply-audio URL to an absolute URL.
///
/// Absolute URLs pass through untouched. Root-relative URLs join the
/// base URL directly; bare paths join under the conversation path.
pub fn resolve_audio_url(config: &ClientConfig, audio_url: &str) -> String {
    if audio_url.starts_with("http") {
        return audio_url.to_string();
    }
    if audio_url.starts_with('/') {
        format!("{}{audio_url}", config.base_url)
    } else {
        format!("{}{}/{audio_url}", config.base_url, config.conversation_path)
    }
}

/// Append a cache-busting `cb` parameter, unique per call.
///
/// With `with_rnd`, a random suffix is added as well so two probes
/// issued within the same millisecond still differ.
pub fn with_cache_buster(url: &str, with_rnd: bool) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    let ts = Utc::now().timestamp_millis();
    if with_rnd {
        format!("{url}{sep}cb={ts}&rnd={}", random_suffix())
    } else {
        format!("{url}{sep}cb={ts}")
    }
}

/// Append the materializer's `cacheBust` parameter. Idempotent: a URL
/// that already carries one is returned unchanged.
pub fn with_materialize_buster(path: &str) -> String {
    if path.contains(CACHE_BUST_KEY) {
        return path.to_string();
    }
    let sep = if path.contains('?') { '&' } else { '?' };
    format!("{path}{sep}{CACHE_BUST_KEY}={}", Utc::now().timestamp_millis())
}

/// Short random suffix for unique file names and probe URLs.
pub fn random_suffix() -> String {
    Uuid::new_v4().simple().to_string()[..6].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ClientConfig {
        ClientConfig::new()
            .with_base_url("http://host:8000")
            .with_conversation_path("/conversation")
    }

    #[test]
    fn absolute_url_passes_through() {
        let url = resolve_audio_url(&config(), "http://cdn/reply.mp3");
        assert_eq!(url, "http://cdn/reply.mp3");
    }

    #[test]
    fn root_relative_joins_base() {
        let url = resolve_audio_url(&config(), "/audio/reply.mp3");
        assert_eq!(url, "http://host:8000/audio/reply.mp3");
    }

    #[test]
    fn bare_path_joins_conversation_path() {
        let url = resolve_audio_url(&config(), "reply.mp3");
        assert_eq!(url, "http://host:8000/conversation/reply.mp3");
    }

    #[test]
    fn cache_buster_uses_query_separator() {
        let plain = with_cache_buster("http://h/a.mp3", false);
        assert!(plain.starts_with("http://h/a.mp3?cb="));

        let appended = with_cache_buster("http://h/a.mp3?x=1", false);
        assert!(appended.starts_with("http://h/a.mp3?x=1&cb="));
    }

    #[test]
    fn cache_buster_rnd_differs_per_call() {
        let a = with_cache_buster("http://h/a.mp3", true);
        let b = with_cache_buster("http://h/a.mp3", true);
        assert!(a.contains("&rnd="));
        assert_ne!(a, b);
    }

    #[test]
    fn materialize_buster_is_idempotent() {
        let once = with_materialize_buster("/tmp/reply.mp3");
        assert!(once.contains("cacheBust="));
        let twice = with_materialize_buster(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn random_suffix_is_short_and_unique() {
        let a = random_suffix();
        let b = random_suffix();
        assert_eq!(a.len(), 6);
        assert_ne!(a, b);
    }
}
