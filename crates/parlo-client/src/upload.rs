//! Conversation upload.
//!
//! Builds the multipart request carrying an audio payload plus
//! language metadata, sends it with progress reporting, and maps the
//! response into a [`ConversationReply`] or a descriptive failure.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::debug;
use url::Url;

use parlo_core::ConversationReply;

use crate::client::ConversationClient;
use crate::error::{ClientError, ClientResult};
use crate::http::{ByteProgress, HttpBackend, MultipartPayload};

/// Fractional upload progress callback (0-100, monotonically
/// non-decreasing within one upload call).
pub type UploadProgress = Arc<dyn Fn(u8) + Send + Sync>;

/// The audio payload of an upload: either bytes already in memory or a
/// reference to a file on disk, resolved into the wire format at the
/// transport boundary.
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// An in-memory byte buffer.
    Bytes {
        data: Vec<u8>,
        file_name: String,
        mime: String,
    },
    /// A file on the local filesystem. Name and MIME type are derived
    /// from the path.
    File { path: PathBuf },
}

impl AudioSource {
    /// Audio held in memory.
    pub fn from_bytes(
        data: Vec<u8>,
        file_name: impl Into<String>,
        mime: impl Into<String>,
    ) -> Self {
        Self::Bytes {
            data,
            file_name: file_name.into(),
            mime: mime.into(),
        }
    }

    /// Audio referenced by path.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self::File { path: path.into() }
    }

    /// Resolve into raw bytes plus advertised name and MIME type.
    async fn resolve(self) -> ClientResult<(Vec<u8>, String, String)> {
        match self {
            Self::Bytes {
                data,
                file_name,
                mime,
            } => Ok((data, file_name, mime)),
            Self::File { path } => {
                let data =
                    tokio::fs::read(&path)
                        .await
                        .map_err(|e| ClientError::InvalidPayload {
                            message: format!("cannot read {}: {e}", path.display()),
                        })?;
                let file_name = path.file_name().map_or_else(
                    || format!("recording_{}.wav", Utc::now().timestamp_millis()),
                    |n| n.to_string_lossy().into_owned(),
                );
                let mime = mime_for_path(&path);
                Ok((data, file_name, mime))
            }
        }
    }
}

/// MIME type guessed from a file extension, defaulting to `audio/wav`.
fn mime_for_path(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",
        Some("ogg") => "audio/ogg",
        Some("flac") => "audio/flac",
        Some("webm") => "audio/webm",
        _ => "audio/wav",
    }
    .to_string()
}

/// One conversation upload, constructed per call.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub audio: AudioSource,
    /// Source language of the recording.
    pub lang: String,
    /// Language the reply should be generated in.
    pub target_lang: String,
}

impl UploadRequest {
    /// Build a request with the default `en` → `en` language pair.
    pub fn new(audio: AudioSource) -> Self {
        Self {
            audio,
            lang: "en".to_string(),
            target_lang: "en".to_string(),
        }
    }

    /// Override the language pair.
    #[must_use]
    pub fn with_languages(mut self, lang: impl Into<String>, target_lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self.target_lang = target_lang.into();
        self
    }
}

impl<B: HttpBackend> ConversationClient<B> {
    /// Upload an audio payload to the conversation endpoint.
    ///
    /// Progress callbacks receive `round(bytes_sent / bytes_total * 100)`
    /// whenever the transport exposes byte counters; values are
    /// monotonically non-decreasing and never exceed 100. Zero events
    /// is a valid outcome.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub async fn upload(
        &self,
        request: UploadRequest,
        on_progress: Option<UploadProgress>,
    ) -> ClientResult<ConversationReply> {
        let endpoint = format!("{}{}", self.config.base_url, self.config.conversation_path);
        let url = Url::parse(&endpoint)?;

        let (data, file_name, mime) = request.audio.resolve().await?;
        debug!(bytes = data.len(), endpoint = %url, "uploading conversation audio");

        let on_bytes: Option<ByteProgress> = on_progress.map(|cb| {
            let last = Arc::new(AtomicU8::new(0));
            Arc::new(move |sent: u64, total: u64| {
                if total == 0 {
                    return;
                }
                let percent = ((sent as f64 / total as f64) * 100.0).round().min(100.0) as u8;
                // fetch_max keeps the sequence non-decreasing even if
                // the transport replays a counter
                let prev = last.fetch_max(percent, Ordering::Relaxed);
                if percent > prev {
                    cb(percent);
                }
            }) as ByteProgress
        });

        let payload = MultipartPayload {
            data,
            file_name,
            mime,
            lang: request.lang,
            target_lang: request.target_lang,
        };

        let reply = self.backend.post_conversation(&url, payload, on_bytes).await?;
        if !reply.success {
            return Err(ClientError::InvalidResponse {
                message: "conversation backend reported failure".to_string(),
            });
        }

        debug!(
            transcript_len = reply.transcript.len(),
            reply_audio_url = %reply.reply_audio_url,
            "conversation upload complete"
        );
        Ok(reply)
    }
}
