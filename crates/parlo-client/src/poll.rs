//! Poll loop and download orchestration.
//!
//! Drives repeated readiness probes on a fixed interval, tracks
//! change-detection and stability state across ticks, applies the poll
//! budget, and on acceptance downloads the reply audio (falling back
//! to the direct remote URL when local caching fails).
//!
//! The loop is cooperative and single-threaded: each tick fully
//! completes, including its own network call, before the next one is
//! scheduled, so no two probes for the same session are ever in
//! flight concurrently and nothing can resolve a session twice.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use parlo_core::PollingStatus;

use crate::client::ConversationClient;
use crate::error::{ClientError, ClientResult};
use crate::http::HttpBackend;
use crate::probe::{snapshot_changed, ResourceSnapshot};
use crate::url::{resolve_audio_url, with_cache_buster};

/// Callback receiving status projections as a poll session progresses.
pub type StatusProgress = Arc<dyn Fn(PollingStatus) + Send + Sync>;

/// Explicit per-session state. Confirmation is only reachable through
/// `Confirming`, so "confirmed before any change was detected" cannot
/// be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// No change observed yet; comparing against the session baseline.
    Watching,
    /// A change was detected and the baseline replaced; counting
    /// consecutive identical size observations.
    Confirming { stable_repeats: u8 },
    /// Stability confirmed; the resource is trusted.
    Confirmed,
}

/// State one poll invocation threads through its lifetime. Owned
/// exclusively by the orchestrator; concurrent polls for the same URL
/// get fully independent sessions (overlapping them is the caller's
/// responsibility to avoid).
struct PollSession {
    baseline: ResourceSnapshot,
    phase: Phase,
}

impl PollSession {
    const fn new(baseline: ResourceSnapshot) -> Self {
        Self {
            baseline,
            phase: Phase::Watching,
        }
    }

    /// Apply one reachable snapshot.
    ///
    /// Returns `true` when this observation is the first detected
    /// change: the baseline is replaced with the new snapshot (so
    /// later comparisons measure stability after the change, not drift
    /// from the original) and the caller must wait one more tick
    /// before evaluating further; a single-shot change is not yet
    /// trusted.
    fn observe(&mut self, snapshot: ResourceSnapshot, required_stable_repeats: u8) -> bool {
        match self.phase {
            Phase::Watching => {
                if snapshot_changed(&self.baseline, &snapshot) {
                    debug!(
                        size = ?snapshot.size_bytes,
                        etag = ?snapshot.etag,
                        "change detected; awaiting stability"
                    );
                    self.baseline = snapshot;
                    self.phase = Phase::Confirming { stable_repeats: 0 };
                    return true;
                }
                false
            }
            Phase::Confirming { stable_repeats } => {
                let stable = snapshot.size_bytes.is_some()
                    && snapshot.size_bytes == self.baseline.size_bytes;
                // any mismatch resets the counter: a fluctuating size
                // means the file is still being written
                let repeats = if stable { stable_repeats + 1 } else { 0 };
                self.phase = if repeats >= required_stable_repeats {
                    Phase::Confirmed
                } else {
                    Phase::Confirming {
                        stable_repeats: repeats,
                    }
                };
                false
            }
            Phase::Confirmed => false,
        }
    }

    const fn confirmed(&self) -> bool {
        matches!(self.phase, Phase::Confirmed)
    }
}

impl<B: HttpBackend> ConversationClient<B> {
    /// Poll a reply-audio URL until the generated file is ready, then
    /// download it and return the local path.
    ///
    /// Rejects with [`ClientError::PollTimeout`] once the configured
    /// budget expires. See [`Self::poll_for_audio_cancellable`] for the
    /// cancellable variant.
    pub async fn poll_for_audio(
        &self,
        audio_url: &str,
        on_status: Option<StatusProgress>,
    ) -> ClientResult<String> {
        self.poll_for_audio_cancellable(audio_url, on_status, &CancellationToken::new())
            .await
    }

    /// Poll with an explicit cancellation handle.
    ///
    /// Cancellation takes effect at the next tick boundary: the
    /// session resolves into [`ClientError::Cancelled`] and schedules
    /// no further work; a response from an in-flight probe is
    /// discarded rather than mutating terminal state.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub async fn poll_for_audio_cancellable(
        &self,
        audio_url: &str,
        on_status: Option<StatusProgress>,
        cancel: &CancellationToken,
    ) -> ClientResult<String> {
        let interval = self.config.poll_interval;
        let timeout = self.config.poll_timeout;
        let grace = self.config.grace_period;
        let started = Instant::now();

        let emit = |status: PollingStatus| {
            if let Some(cb) = &on_status {
                cb(status);
            }
        };

        // Baseline snapshot at t=0; unreachable is a valid baseline.
        let baseline = self.probe(audio_url).await;
        let mut session = PollSession::new(baseline);

        loop {
            if cancel.is_cancelled() {
                emit(PollingStatus::Error {
                    message: ClientError::Cancelled.to_string(),
                });
                return Err(ClientError::Cancelled);
            }

            let elapsed = started.elapsed();
            if elapsed >= timeout {
                // Best-effort last check: some servers block HEAD
                // probes yet still serve the file.
                if self.check_audio_ready(audio_url).await {
                    emit(PollingStatus::Downloading { percent: 95 });
                    return self.finish_download(audio_url, &emit).await;
                }
                debug!(elapsed_ms = elapsed.as_millis() as u64, "poll budget exhausted");
                emit(PollingStatus::Timeout);
                return Err(ClientError::PollTimeout);
            }

            // Progress never reaches 100 while polling; the last 5%
            // belongs to the download phase.
            let percent =
                ((elapsed.as_millis() as f64 / timeout.as_millis() as f64) * 100.0).min(95.0) as u8;
            emit(PollingStatus::Polling { percent });

            let snapshot = self.probe(audio_url).await;
            if snapshot.reachable {
                if session.observe(snapshot, self.config.required_stable_repeats) {
                    // first detected change: one more tick before any
                    // acceptance evaluation
                    if sleep_or_cancel(cancel, interval).await.is_err() {
                        emit(PollingStatus::Error {
                            message: ClientError::Cancelled.to_string(),
                        });
                        return Err(ClientError::Cancelled);
                    }
                    continue;
                }

                // Accept on confirmed stability, or on reachability
                // alone once the grace period has elapsed; backends
                // whose metadata never changes would otherwise hang
                // the loop forever.
                if session.confirmed() || elapsed > grace {
                    if !session.confirmed() {
                        debug!("grace period elapsed; accepting on reachability");
                    }
                    emit(PollingStatus::Downloading { percent: 95 });
                    return self.finish_download(audio_url, &emit).await;
                }
            }

            if sleep_or_cancel(cancel, interval).await.is_err() {
                emit(PollingStatus::Error {
                    message: ClientError::Cancelled.to_string(),
                });
                return Err(ClientError::Cancelled);
            }
        }
    }

    /// Download the accepted resource, degrading to the direct remote
    /// URL when local caching fails.
    async fn finish_download(
        &self,
        audio_url: &str,
        emit: &impl Fn(PollingStatus),
    ) -> ClientResult<String> {
        match self.download_audio(audio_url).await {
            Ok(local_path) => {
                emit(PollingStatus::Ready {
                    path: local_path.clone(),
                });
                Ok(local_path)
            }
            Err(e) => {
                warn!(error = %e, "download failed; resolving with direct remote URL");
                let direct = resolve_audio_url(&self.config, audio_url);
                emit(PollingStatus::Ready {
                    path: direct.clone(),
                });
                Ok(direct)
            }
        }
    }

    /// Download the reply audio into the cache directory and return
    /// the local path.
    pub async fn download_audio(&self, audio_url: &str) -> ClientResult<String> {
        let resolved = resolve_audio_url(&self.config, audio_url);
        let busted = with_cache_buster(&resolved, false);
        let url = Url::parse(&busted)?;

        let file_name = remote_file_name(audio_url);
        let dest = self.config.cache_dir.join(file_name);

        self.backend.download_to(&url, &dest).await?;
        debug!(path = %dest.display(), "reply audio downloaded");
        Ok(dest.to_string_lossy().into_owned())
    }
}

/// File name for a downloaded reply, taken from the URL's last path
/// segment.
fn remote_file_name(audio_url: &str) -> String {
    let without_query = audio_url.split('?').next().unwrap_or(audio_url);
    let last = without_query.rsplit('/').next().unwrap_or("");
    if last.is_empty() {
        format!("audio_{}.mp3", chrono::Utc::now().timestamp_millis())
    } else {
        last.to_string()
    }
}

/// Wait one poll interval, resolving early into `Cancelled` when the
/// caller gives up.
async fn sleep_or_cancel(cancel: &CancellationToken, interval: Duration) -> ClientResult<()> {
    tokio::select! {
        biased;

        () = cancel.cancelled() => Err(ClientError::Cancelled),

        () = tokio::time::sleep(interval) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::http::testing::{FakeBackend, ScriptedHead};
    use crate::http::HeadMeta;
    use std::sync::Mutex;

    fn test_config(cache_dir: &std::path::Path) -> ClientConfig {
        ClientConfig::new()
            .with_base_url("http://fake:8000")
            .with_poll_interval(Duration::from_millis(2000))
            .with_poll_timeout(Duration::from_millis(10_000))
            .with_cache_dir(cache_dir)
    }

    fn collect_statuses() -> (StatusProgress, Arc<Mutex<Vec<PollingStatus>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let cb: StatusProgress = Arc::new(move |s| sink.lock().unwrap().push(s));
        (cb, seen)
    }

    fn meta(size: u64) -> ScriptedHead {
        ScriptedHead::Meta(HeadMeta::with_size(size))
    }

    #[test]
    fn session_requires_change_before_confirmation() {
        let baseline = ResourceSnapshot {
            reachable: true,
            size_bytes: Some(1000),
            ..ResourceSnapshot::default()
        };
        let mut session = PollSession::new(baseline.clone());

        // identical snapshots never leave Watching
        assert!(!session.observe(baseline.clone(), 2));
        assert!(!session.confirmed());

        // first change rebaselines and asks for another tick
        let changed = ResourceSnapshot {
            size_bytes: Some(2500),
            ..baseline
        };
        assert!(session.observe(changed.clone(), 2));
        assert_eq!(session.baseline.size_bytes, Some(2500));

        // two identical post-change sizes confirm
        assert!(!session.observe(changed.clone(), 2));
        assert!(!session.confirmed());
        assert!(!session.observe(changed, 2));
        assert!(session.confirmed());
    }

    #[test]
    fn session_flapping_size_resets_counter() {
        let baseline = ResourceSnapshot {
            reachable: true,
            size_bytes: Some(1000),
            ..ResourceSnapshot::default()
        };
        let mut session = PollSession::new(baseline.clone());

        let changed = ResourceSnapshot {
            size_bytes: Some(2500),
            ..baseline.clone()
        };
        session.observe(changed.clone(), 2);
        session.observe(changed.clone(), 2); // repeats = 1

        let flapped = ResourceSnapshot {
            size_bytes: Some(2600),
            ..baseline
        };
        session.observe(flapped, 2); // reset to 0
        assert!(!session.confirmed());

        // note: the flap did not rebaseline, so stability is still
        // measured against 2500
        session.observe(changed.clone(), 2);
        session.observe(changed, 2);
        assert!(session.confirmed());
    }

    #[tokio::test(start_paused = true)]
    async fn never_reachable_rejects_with_timeout_at_budget() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FakeBackend::new(); // every probe unreachable
        let client = ConversationClient::with_backend(test_config(dir.path()), backend);

        let (cb, seen) = collect_statuses();
        let started = Instant::now();
        let err = client
            .poll_for_audio("/audio/reply.mp3", Some(cb))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Audio polling timeout");
        // rejected at ~10s (the budget), not later
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(10_000));
        assert!(elapsed < Duration::from_millis(12_001));
        assert_eq!(*seen.lock().unwrap().last().unwrap(), PollingStatus::Timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn size_change_then_stability_resolves_with_local_path() {
        let dir = tempfile::tempdir().unwrap();
        // baseline 1000, then 1000, 2500 (change), 2500, 2500 (confirm)
        let backend = FakeBackend::new()
            .with_head_sequence([
                meta(1000), // baseline
                meta(1000),
                meta(2500),
                meta(2500),
                meta(2500),
            ])
            .with_head_fallback(meta(2500));
        let client = ConversationClient::with_backend(test_config(dir.path()), backend);

        let (cb, seen) = collect_statuses();
        let path = client
            .poll_for_audio("/audio/reply.mp3", Some(cb))
            .await
            .unwrap();

        assert!(path.contains("reply.mp3"));
        assert!(std::path::Path::new(&path).exists());
        assert_eq!(client.backend.downloaded_count(), 1);

        // progress hits exactly 100 only at resolution
        let seen = seen.lock().unwrap();
        let last = seen.last().unwrap();
        assert!(matches!(last, PollingStatus::Ready { .. }));
        assert!(seen[..seen.len() - 1].iter().all(|s| s.percent() < 100));
    }

    #[tokio::test(start_paused = true)]
    async fn static_metadata_accepted_after_grace_period() {
        let dir = tempfile::tempdir().unwrap();
        // size never changes; reachability alone must win after 8s,
        // well before the budget
        let backend = FakeBackend::new().with_head_fallback(meta(1000));
        let config = test_config(dir.path()).with_poll_timeout(Duration::from_secs(60));
        let client = ConversationClient::with_backend(config, backend);

        let started = Instant::now();
        let path = client.poll_for_audio("/audio/reply.mp3", None).await.unwrap();

        assert!(std::path::Path::new(&path).exists());
        let elapsed = started.elapsed();
        assert!(elapsed > Duration::from_secs(8));
        assert!(elapsed < Duration::from_secs(12));
    }

    #[tokio::test(start_paused = true)]
    async fn download_failure_falls_back_to_direct_url() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FakeBackend::new()
            .with_head_sequence([meta(1000), meta(2500), meta(2500), meta(2500)])
            .with_head_fallback(meta(2500))
            .with_download_failure();
        let client = ConversationClient::with_backend(test_config(dir.path()), backend);

        let (cb, seen) = collect_statuses();
        let resolved = client
            .poll_for_audio("/audio/reply.mp3", Some(cb))
            .await
            .unwrap();

        // playback may still succeed straight off the network
        assert_eq!(resolved, "http://fake:8000/audio/reply.mp3");
        assert!(matches!(
            seen.lock().unwrap().last().unwrap(),
            PollingStatus::Ready { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FakeBackend::new(); // never ready
        let client = ConversationClient::with_backend(test_config(dir.path()), backend);

        let cancel = CancellationToken::new();
        let handle = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(3000)).await;
            handle.cancel();
        });

        let started = Instant::now();
        let err = client
            .poll_for_audio_cancellable("/audio/reply.mp3", None, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Cancelled));
        assert!(started.elapsed() < Duration::from_millis(10_000));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_last_chance_check_can_still_succeed() {
        let dir = tempfile::tempdir().unwrap();
        // unreachable for the whole budget, but the final optimistic
        // HEAD comes back 200
        let mut script: Vec<ScriptedHead> = Vec::new();
        for _ in 0..6 {
            script.push(ScriptedHead::Unreachable);
        }
        script.push(meta(4096)); // the last-chance check
        let backend = FakeBackend::new()
            .with_head_sequence(script)
            .with_head_fallback(meta(4096));
        let client = ConversationClient::with_backend(test_config(dir.path()), backend);

        let path = client.poll_for_audio("/audio/reply.mp3", None).await.unwrap();
        assert!(std::path::Path::new(&path).exists());
    }

    #[test]
    fn remote_file_name_from_url() {
        assert_eq!(remote_file_name("/audio/reply.mp3"), "reply.mp3");
        assert_eq!(remote_file_name("http://h/x/y.wav?cb=1"), "y.wav");
        assert!(remote_file_name("http://h/x/").starts_with("audio_"));
    }
}
