//! Local audio materialization.
//!
//! Downstream audio players cache by path identity, so serving a reply
//! through a path the player has seen before can replay a stale
//! buffer. The materializer forces a brand-new path for every reply:
//! remote URLs are downloaded to a freshly named cache file, local
//! files are copied under a new unique name, and every result carries
//! a `cacheBust` query suffix as a second line of defense against
//! layers that compare the full string.

use chrono::Utc;
use tracing::warn;
use url::Url;

use crate::client::ConversationClient;
use crate::error::ClientResult;
use crate::http::HttpBackend;
use crate::url::{random_suffix, with_cache_buster, with_materialize_buster};

impl<B: HttpBackend> ConversationClient<B> {
    /// Guarantee a never-before-seen local path for a reply source.
    ///
    /// Never fails: on any internal error this degrades to the
    /// original path with the cache-busting suffix appended. Two calls
    /// with the same source always produce two different paths.
    pub async fn ensure_unique_path(&self, source: &str) -> String {
        match self.materialize(source).await {
            Ok(path) => path,
            Err(e) => {
                warn!(error = %e, source, "materialization failed; falling back to source path");
                with_materialize_buster(source)
            }
        }
    }

    async fn materialize(&self, source: &str) -> ClientResult<String> {
        let file_name = format!(
            "reply_{}_{}.{}",
            Utc::now().timestamp_millis(),
            random_suffix(),
            extension_of(source).unwrap_or("mp3")
        );
        let dest = self.config.cache_dir.join(file_name);
        tokio::fs::create_dir_all(&self.config.cache_dir).await?;

        if source.starts_with("http") {
            let busted = with_cache_buster(source, false);
            let url = Url::parse(&busted)?;
            self.backend.download_to(&url, &dest).await?;
        } else {
            let path = source.strip_prefix("file://").unwrap_or(source);
            // an earlier materialization may have left a query suffix
            let path = path.split('?').next().unwrap_or(path);
            tokio::fs::copy(path, &dest).await?;
        }

        Ok(with_materialize_buster(&dest.to_string_lossy()))
    }
}

/// Extension of the source's file component, when it has a plausible one.
fn extension_of(source: &str) -> Option<&str> {
    let without_query = source.split('?').next().unwrap_or(source);
    let last = without_query.rsplit('/').next().unwrap_or(without_query);
    let ext = last.rsplit_once('.')?.1;
    if ext.is_empty() || ext.len() > 4 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        None
    } else {
        Some(ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::http::testing::FakeBackend;

    fn client_with_cache(dir: &std::path::Path) -> ConversationClient<FakeBackend> {
        let config = ClientConfig::new()
            .with_base_url("http://fake:8000")
            .with_cache_dir(dir);
        ConversationClient::with_backend(config, FakeBackend::new())
    }

    fn strip_buster(path: &str) -> &str {
        path.split('?').next().unwrap()
    }

    #[tokio::test]
    async fn remote_source_downloads_to_fresh_file() {
        let dir = tempfile::tempdir().unwrap();
        let client = client_with_cache(dir.path());

        let path = client
            .ensure_unique_path("http://fake:8000/audio/reply.mp3")
            .await;

        assert!(path.contains("cacheBust="));
        let local = strip_buster(&path);
        assert!(local.contains("reply_"));
        assert!(local.ends_with(".mp3") || local.contains(".mp3"));
        assert!(std::path::Path::new(local).exists());
        assert_eq!(client.backend.downloaded_count(), 1);
    }

    #[tokio::test]
    async fn same_source_twice_yields_distinct_paths() {
        let dir = tempfile::tempdir().unwrap();
        let client = client_with_cache(dir.path());

        let first = client
            .ensure_unique_path("http://fake:8000/audio/reply.mp3")
            .await;
        let second = client
            .ensure_unique_path("http://fake:8000/audio/reply.mp3")
            .await;

        assert_ne!(strip_buster(&first), strip_buster(&second));
    }

    #[tokio::test]
    async fn local_source_is_copied_not_reused() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("downloaded.wav");
        std::fs::write(&original, b"pcm bytes").unwrap();

        let client = client_with_cache(dir.path());
        let path = client
            .ensure_unique_path(&original.to_string_lossy())
            .await;

        let local = strip_buster(&path);
        assert_ne!(local, original.to_string_lossy());
        assert!(local.contains("reply_"));
        assert_eq!(std::fs::read(local).unwrap(), b"pcm bytes");
        // original left in place
        assert!(original.exists());
    }

    #[tokio::test]
    async fn failure_degrades_to_source_with_buster() {
        let dir = tempfile::tempdir().unwrap();
        let client = client_with_cache(dir.path());

        let path = client.ensure_unique_path("/no/such/file.wav").await;
        assert!(path.starts_with("/no/such/file.wav?cacheBust="));
    }

    #[test]
    fn extension_parsing() {
        assert_eq!(extension_of("http://h/a/reply.mp3?cb=1"), Some("mp3"));
        assert_eq!(extension_of("/tmp/clip.wav"), Some("wav"));
        assert_eq!(extension_of("/tmp/noext"), None);
        assert_eq!(extension_of("http://h/a.verylongext"), None);
    }
}
