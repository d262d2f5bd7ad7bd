//! Conversation upload, audio readiness polling, and reply
//! materialization.
//!
//! The interesting problem here is detecting, with nothing but
//! conditional HEAD probes, the moment a backend finishes generating a
//! reply audio file, and telling a genuinely new artifact apart from
//! a stale cached file still sitting at the same URL. The
//! [`ConversationClient`] drives that protocol end to end: multipart
//! upload with progress, metadata probing with a four-signal
//! change-detection policy, a stability-confirmed poll loop with a
//! grace-period fallback, and a materializer that guarantees
//! downstream players a never-before-seen local path.

mod client;
pub mod config;
pub mod error;
mod http;
mod materialize;
mod poll;
mod probe;
mod upload;
mod url;

pub use client::{ConversationClient, DefaultConversationClient};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use http::{ByteProgress, HeadMeta, HttpBackend, MultipartPayload, ReqwestBackend};
pub use poll::StatusProgress;
pub use probe::{snapshot_changed, ResourceSnapshot};
pub use upload::{AudioSource, UploadProgress, UploadRequest};

pub use crate::url::{resolve_audio_url, with_cache_buster};
