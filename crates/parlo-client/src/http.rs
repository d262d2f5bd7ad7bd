//! HTTP backend abstraction for the conversation API.
//!
//! This module provides a trait-based HTTP backend that allows for
//! dependency injection and easy testing. The production
//! implementation uses reqwest with streamed multipart uploads and
//! streamed downloads.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use url::Url;

use parlo_core::ConversationReply;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Chunk size for streamed multipart bodies. Small enough that byte
/// counters produce useful progress on typical recordings.
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Callback receiving (`bytes_sent`, `bytes_total`) while a request
/// body streams out.
pub type ByteProgress = Arc<dyn Fn(u64, u64) + Send + Sync>;

// ============================================================================
// Wire types
// ============================================================================

/// The multipart form carried by a conversation upload.
#[derive(Debug, Clone)]
pub struct MultipartPayload {
    /// Raw audio bytes for the `file` field.
    pub data: Vec<u8>,
    /// File name advertised in the multipart part.
    pub file_name: String,
    /// MIME type advertised in the multipart part.
    pub mime: String,
    /// Source language (`lang` field).
    pub lang: String,
    /// Target language (`target_lang` field).
    pub target_lang: String,
}

/// Metadata observed from a HEAD response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadMeta {
    /// HTTP status code.
    pub status: u16,
    /// `Content-Length`, parsed; absent header stays `None`, never zero.
    pub content_length: Option<u64>,
    /// `Last-Modified`, verbatim.
    pub last_modified: Option<String>,
    /// `ETag`, verbatim.
    pub etag: Option<String>,
}

impl HeadMeta {
    /// A 200 response advertising only a size.
    #[must_use]
    pub const fn with_size(size: u64) -> Self {
        Self {
            status: 200,
            content_length: Some(size),
            last_modified: None,
            etag: None,
        }
    }
}

// ============================================================================
// HTTP Backend Trait
// ============================================================================

/// Trait for HTTP backends the conversation client drives.
///
/// This abstraction allows for dependency injection of HTTP transports,
/// making the upload/probe/poll logic testable without a server.
#[async_trait]
pub trait HttpBackend: Send + Sync {
    /// POST the multipart conversation form and decode the JSON reply.
    ///
    /// `on_bytes` receives raw byte counters as the body streams out;
    /// implementations may emit zero events.
    async fn post_conversation(
        &self,
        url: &Url,
        payload: MultipartPayload,
        on_bytes: Option<ByteProgress>,
    ) -> ClientResult<ConversationReply>;

    /// Issue a HEAD request with cache-defeating headers and a short
    /// timeout, returning the status and readiness-relevant headers.
    async fn head_metadata(&self, url: &Url) -> ClientResult<HeadMeta>;

    /// Stream a GET response to a local destination file.
    async fn download_to(&self, url: &Url, dest: &Path) -> ClientResult<()>;
}

// ============================================================================
// Reqwest Backend
// ============================================================================

/// Production HTTP backend using reqwest.
///
/// Timeouts are applied per request: the upload budget for POST, the
/// probe budget for HEAD. Downloads run without a fixed budget; the
/// poll orchestrator owns the overall clock.
pub struct ReqwestBackend {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    upload_timeout: std::time::Duration,
    probe_timeout: std::time::Duration,
}

impl ReqwestBackend {
    /// Create a new reqwest backend from the client configuration.
    pub fn new(config: &ClientConfig) -> Self {
        let client = reqwest::Client::builder()
            .build()
            .expect("failed to create HTTP client");

        Self {
            client,
            base_url: config.base_url.clone(),
            token: config.token.clone(),
            upload_timeout: config.upload_timeout,
            probe_timeout: config.probe_timeout,
        }
    }

    /// Attach the bearer token when one is configured. Omission is
    /// silent by contract.
    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Cache-defeating headers sent with probes and downloads.
    fn no_cache(request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("Cache-Control", "no-cache")
            .header("Pragma", "no-cache")
    }

    fn transport_error(&self, err: &reqwest::Error) -> ClientError {
        ClientError::from_transport(&self.base_url, self.upload_timeout.as_secs(), err)
    }
}

#[async_trait]
impl HttpBackend for ReqwestBackend {
    async fn post_conversation(
        &self,
        url: &Url,
        payload: MultipartPayload,
        on_bytes: Option<ByteProgress>,
    ) -> ClientResult<ConversationReply> {
        let total = payload.data.len() as u64;
        let chunks: Vec<Vec<u8>> = payload
            .data
            .chunks(UPLOAD_CHUNK_SIZE)
            .map(<[u8]>::to_vec)
            .collect();

        // Counting stream: reqwest pulls chunks as it writes the body,
        // so the callback tracks bytes actually handed to the socket.
        let mut sent: u64 = 0;
        let body_stream = futures_util::stream::iter(chunks.into_iter().map(move |chunk| {
            sent += chunk.len() as u64;
            if let Some(cb) = &on_bytes {
                cb(sent, total);
            }
            Ok::<Vec<u8>, std::io::Error>(chunk)
        }));

        let part =
            reqwest::multipart::Part::stream_with_length(reqwest::Body::wrap_stream(body_stream), total)
                .file_name(payload.file_name)
                .mime_str(&payload.mime)
                .map_err(|e| ClientError::InvalidPayload {
                    message: e.to_string(),
                })?;

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("lang", payload.lang)
            .text("target_lang", payload.target_lang);

        let request = self
            .authorize(self.client.post(url.as_str()))
            .multipart(form)
            .timeout(self.upload_timeout);

        let response = request
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::UploadFailed {
                status: status.as_u16(),
            });
        }

        response
            .json::<ConversationReply>()
            .await
            .map_err(|e| ClientError::InvalidResponse {
                message: e.to_string(),
            })
    }

    async fn head_metadata(&self, url: &Url) -> ClientResult<HeadMeta> {
        let request = Self::no_cache(self.authorize(self.client.head(url.as_str())))
            .timeout(self.probe_timeout);

        let response = request
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let headers = response.headers();
        let content_length = headers
            .get(reqwest::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        let last_modified = headers
            .get(reqwest::header::LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        let etag = headers
            .get(reqwest::header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);

        Ok(HeadMeta {
            status: response.status().as_u16(),
            content_length,
            last_modified,
            etag,
        })
    }

    async fn download_to(&self, url: &Url, dest: &Path) -> ClientResult<()> {
        let request = Self::no_cache(self.authorize(self.client.get(url.as_str())));

        let response = request
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Network {
                base_url: self.base_url.clone(),
                message: format!("download failed with HTTP {status}"),
            });
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ClientError::Network {
                base_url: self.base_url.clone(),
                message: e.to_string(),
            })?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        Ok(())
    }
}

// ============================================================================
// Fake Backend for Testing
// ============================================================================


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn head_meta_with_size() {
        let meta = HeadMeta::with_size(1234);
        assert_eq!(meta.status, 200);
        assert_eq!(meta.content_length, Some(1234));
        assert!(meta.last_modified.is_none());
        assert!(meta.etag.is_none());
    }

    #[test]
    fn reqwest_backend_creation() {
        let config = ClientConfig::new().with_token("tok");
        let backend = ReqwestBackend::new(&config);
        assert_eq!(backend.token, Some("tok".to_string()));
        assert_eq!(backend.probe_timeout, std::time::Duration::from_secs(5));
    }

    #[tokio::test]
    async fn fake_backend_head_script_then_fallback() {
        use testing::{FakeBackend, ScriptedHead};

        let backend = FakeBackend::new()
            .with_head_sequence([ScriptedHead::Meta(HeadMeta::with_size(10))])
            .with_head_fallback(ScriptedHead::Meta(HeadMeta::with_size(20)));

        let url = Url::parse("http://fake/a.mp3").unwrap();
        assert_eq!(
            backend.head_metadata(&url).await.unwrap().content_length,
            Some(10)
        );
        assert_eq!(
            backend.head_metadata(&url).await.unwrap().content_length,
            Some(20)
        );
        assert_eq!(
            backend.head_metadata(&url).await.unwrap().content_length,
            Some(20)
        );
        assert_eq!(backend.probed_count(), 3);
    }

    #[tokio::test]
    async fn fake_backend_unreachable_by_default() {
        use testing::FakeBackend;

        let backend = FakeBackend::new();
        let url = Url::parse("http://fake/a.mp3").unwrap();
        assert!(backend.head_metadata(&url).await.is_err());
    }
}
