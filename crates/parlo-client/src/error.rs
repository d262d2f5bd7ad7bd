//! Error types for the conversation client.
//!
//! Display strings here are part of the observable contract: the CLI
//! surfaces them verbatim, and callers match on the poll-timeout
//! message to offer a retry affordance. Probe failures never appear
//! here; they normalize to an unreachable snapshot instead.

use thiserror::Error;

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by upload, poll, and download operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The backend answered the upload with a non-success status.
    #[error("Upload failed (status {status})")]
    UploadFailed {
        /// HTTP status code
        status: u16,
    },

    /// Connection-level failure reaching the backend.
    #[error("Cannot reach backend at {base_url}. Is it running and reachable from this device?")]
    BackendUnreachable {
        /// The configured base endpoint
        base_url: String,
    },

    /// Generic network failure.
    #[error("Network error contacting {base_url}: {message}")]
    Network {
        /// The configured base endpoint
        base_url: String,
        /// Underlying transport diagnostic
        message: String,
    },

    /// The upload exceeded its wall-clock budget.
    #[error("Upload timed out after {seconds}s")]
    UploadTimeout {
        /// Budget in whole seconds
        seconds: u64,
    },

    /// The poll budget expired before the reply audio was accepted.
    ///
    /// The message is load-bearing: callers distinguish this terminal
    /// failure from others to offer a retry.
    #[error("Audio polling timeout")]
    PollTimeout,

    /// The caller cancelled the poll session.
    #[error("Audio polling cancelled")]
    Cancelled,

    /// The audio payload could not be prepared for the wire.
    #[error("Invalid audio payload: {message}")]
    InvalidPayload {
        /// What was wrong with the payload
        message: String,
    },

    /// The backend returned a body that does not match the contract.
    #[error("Invalid response from conversation API: {message}")]
    InvalidResponse {
        /// Description of what was invalid
        message: String,
    },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Local filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Classify a reqwest transport error into the diagnostic taxonomy.
    ///
    /// Status-bearing failures are handled separately by the caller;
    /// this only sees connection-level errors.
    pub fn from_transport(base_url: &str, upload_timeout_secs: u64, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::UploadTimeout {
                seconds: upload_timeout_secs,
            }
        } else if err.is_connect() {
            Self::BackendUnreachable {
                base_url: base_url.to_string(),
            }
        } else {
            Self::Network {
                base_url: base_url.to_string(),
                message: err.to_string(),
            }
        }
    }
}
