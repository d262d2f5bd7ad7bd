//! Conversation domain types.
//!
//! These types cross the boundary between the client core and its
//! consumers, independent of any transport or storage concerns.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum number of conversation records kept in history.
///
/// Oldest records are evicted once the cap is exceeded
/// (FIFO-by-insertion, not LRU).
pub const MAX_STORED_CONVERSATIONS: usize = 50;

/// Timing breakdown reported by the conversation backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Timings {
    /// Speech-to-text time in seconds.
    pub stt_time: Option<f64>,
    /// LLM generation time in seconds.
    pub llm_time: Option<f64>,
    /// Text-to-speech time in seconds.
    pub tts_time: Option<f64>,
}

/// Response payload from a conversation upload.
///
/// Fields the backend omits deserialize to their defaults; in
/// particular a missing `reply_audio_url` yields an empty string, not
/// an error. Only the top-level `success` flag is validated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationReply {
    pub success: bool,
    pub transcript: String,
    pub reply_text: String,
    pub reply_audio_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timings: Option<Timings>,
}

/// A persisted conversation record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredConversation {
    pub id: String,
    /// Unix timestamp in milliseconds.
    pub timestamp: i64,
    pub transcript: String,
    pub reply_text: String,
    /// Local path of the materialized reply audio, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_audio_path: Option<String>,
    pub server_audio_url: String,
}

impl StoredConversation {
    /// Build a record from a reply, stamped with a fresh id and the
    /// current time.
    #[must_use]
    pub fn from_reply(reply: &ConversationReply, local_audio_path: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now().timestamp_millis(),
            transcript: reply.transcript.clone(),
            reply_text: reply.reply_text.clone(),
            local_audio_path,
            server_audio_url: reply.reply_audio_url.clone(),
        }
    }
}

/// Consumer-facing projection of one audio-poll session.
///
/// This is the only state exposed across the core/UI boundary; the
/// orchestrator's internal state machine stays private.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollingStatus {
    /// No poll in flight.
    Idle,
    /// Probing the reply URL; percent is capped at 95 until the
    /// download phase so 100 is only ever reported on success.
    Polling { percent: u8 },
    /// Resource accepted, download in progress.
    Downloading { percent: u8 },
    /// Resolved; `path` is a local file path or, after a download
    /// failure, the direct remote URL.
    Ready { path: String },
    /// Terminal failure other than budget exhaustion.
    Error { message: String },
    /// Poll budget exhausted before acceptance.
    Timeout,
}

impl PollingStatus {
    /// Progress percentage for display (0-100).
    #[must_use]
    pub const fn percent(&self) -> u8 {
        match self {
            Self::Idle | Self::Error { .. } | Self::Timeout => 0,
            Self::Polling { percent } | Self::Downloading { percent } => *percent,
            Self::Ready { .. } => 100,
        }
    }

    /// Whether this status ends the session.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Ready { .. } | Self::Error { .. } | Self::Timeout
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_missing_fields_default() {
        let reply: ConversationReply =
            serde_json::from_str(r#"{"success": true, "transcript": "hi"}"#).unwrap();
        assert!(reply.success);
        assert_eq!(reply.transcript, "hi");
        assert_eq!(reply.reply_audio_url, "");
        assert!(reply.timings.is_none());
    }

    #[test]
    fn reply_with_timings() {
        let reply: ConversationReply = serde_json::from_str(
            r#"{"success": true, "transcript": "t", "reply_text": "r",
                "reply_audio_url": "/audio/reply.mp3",
                "timings": {"stt_time": 0.4, "llm_time": 1.2}}"#,
        )
        .unwrap();
        let timings = reply.timings.unwrap();
        assert_eq!(timings.stt_time, Some(0.4));
        assert_eq!(timings.llm_time, Some(1.2));
        assert_eq!(timings.tts_time, None);
    }

    #[test]
    fn stored_conversation_from_reply() {
        let reply = ConversationReply {
            success: true,
            transcript: "hello".to_string(),
            reply_text: "world".to_string(),
            reply_audio_url: "http://host/reply.mp3".to_string(),
            timings: None,
        };
        let record = StoredConversation::from_reply(&reply, Some("/tmp/reply.mp3".to_string()));
        assert_eq!(record.transcript, "hello");
        assert_eq!(record.server_audio_url, "http://host/reply.mp3");
        assert_eq!(record.local_audio_path.as_deref(), Some("/tmp/reply.mp3"));
        assert!(!record.id.is_empty());

        let other = StoredConversation::from_reply(&reply, None);
        assert_ne!(record.id, other.id);
    }

    #[test]
    fn polling_status_percent() {
        assert_eq!(PollingStatus::Idle.percent(), 0);
        assert_eq!(PollingStatus::Polling { percent: 42 }.percent(), 42);
        assert_eq!(
            PollingStatus::Ready {
                path: "x".to_string()
            }
            .percent(),
            100
        );
    }

    #[test]
    fn polling_status_terminal() {
        assert!(!PollingStatus::Polling { percent: 10 }.is_terminal());
        assert!(!PollingStatus::Downloading { percent: 95 }.is_terminal());
        assert!(PollingStatus::Timeout.is_terminal());
        assert!(PollingStatus::Ready {
            path: String::new()
        }
        .is_terminal());
    }
}
