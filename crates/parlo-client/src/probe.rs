//! Readiness probing.
//!
//! A probe is a metadata-only HEAD request against the reply-audio
//! URL. Probing never fails: transport errors and non-200 statuses
//! normalize to an unreachable snapshot, because "not ready yet" is a
//! normal polling outcome rather than an exceptional one.

use tracing::debug;
use url::Url;

use crate::client::ConversationClient;
use crate::http::HttpBackend;
use crate::url::{resolve_audio_url, with_cache_buster};

/// Metadata observed from one probe. Captured fresh per probe and
/// never mutated; the orchestrator compares snapshots against a
/// remembered baseline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceSnapshot {
    /// Whether the probe came back 200.
    pub reachable: bool,
    /// `Content-Length` as an integer; an absent header stays `None`,
    /// never zero.
    pub size_bytes: Option<u64>,
    /// `Last-Modified` verbatim.
    pub last_modified: Option<String>,
    /// `ETag` verbatim.
    pub etag: Option<String>,
    /// The exact (cache-busted) URL that was probed.
    pub probed_url: String,
}

impl ResourceSnapshot {
    pub(crate) fn unreachable(url: impl Into<String>) -> Self {
        Self {
            probed_url: url.into(),
            ..Self::default()
        }
    }
}

/// Judge whether `current` describes a genuinely new artifact compared
/// to `baseline`.
///
/// Any single discriminator firing counts as change, since different
/// backend configurations expose different subsets of metadata:
/// - both snapshots carry a size and the sizes differ;
/// - both carry a last-modified value and it differs;
/// - both carry an etag and it differs;
/// - the baseline lacked a value the current snapshot now has (a
///   newly-appeared value covers servers that omit metadata for a
///   not-yet-generated placeholder).
#[must_use]
pub fn snapshot_changed(baseline: &ResourceSnapshot, current: &ResourceSnapshot) -> bool {
    let size_changed = matches!(
        (baseline.size_bytes, current.size_bytes),
        (Some(a), Some(b)) if a != b
    );
    let modified_changed = matches!(
        (&baseline.last_modified, &current.last_modified),
        (Some(a), Some(b)) if a != b
    );
    let etag_changed = matches!(
        (&baseline.etag, &current.etag),
        (Some(a), Some(b)) if a != b
    );
    let newly_appeared = (baseline.size_bytes.is_none() && current.size_bytes.is_some())
        || (baseline.last_modified.is_none() && current.last_modified.is_some())
        || (baseline.etag.is_none() && current.etag.is_some());

    size_changed || modified_changed || etag_changed || newly_appeared
}

impl<B: HttpBackend> ConversationClient<B> {
    /// Probe a reply-audio URL.
    ///
    /// The probed URL carries a per-call cache-busting query parameter
    /// so intermediary caches cannot replay an older HEAD response.
    pub async fn probe(&self, audio_url: &str) -> ResourceSnapshot {
        let resolved = resolve_audio_url(&self.config, audio_url);
        let busted = with_cache_buster(&resolved, true);

        let Ok(url) = Url::parse(&busted) else {
            debug!(url = %busted, "probe URL failed to parse; treating as not ready");
            return ResourceSnapshot::unreachable(busted);
        };

        match self.backend.head_metadata(&url).await {
            Ok(meta) if meta.status == 200 => ResourceSnapshot {
                reachable: true,
                size_bytes: meta.content_length,
                last_modified: meta.last_modified,
                etag: meta.etag,
                probed_url: busted,
            },
            Ok(meta) => {
                debug!(status = meta.status, "probe returned non-200; not ready");
                ResourceSnapshot::unreachable(busted)
            }
            Err(e) => {
                debug!(error = %e, "probe failed; treating as not ready");
                ResourceSnapshot::unreachable(busted)
            }
        }
    }

    /// Bare readiness check: does a HEAD against the URL come back 200?
    ///
    /// Used as the final optimistic check before declaring a poll
    /// timeout.
    pub async fn check_audio_ready(&self, audio_url: &str) -> bool {
        let resolved = resolve_audio_url(&self.config, audio_url);
        let busted = with_cache_buster(&resolved, false);
        match Url::parse(&busted) {
            Ok(url) => matches!(
                self.backend.head_metadata(&url).await,
                Ok(meta) if meta.status == 200
            ),
            Err(_) => false,
        }
    }
}
