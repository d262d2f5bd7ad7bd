//! Core domain types and port definitions for parlo.
//!
//! This crate holds the pure domain model of the conversation flow:
//! the reply payload returned by the conversation API, the persisted
//! conversation record, the consumer-facing polling status projection,
//! resolved client settings, and the `ConversationStore` port that
//! history backends implement. No infrastructure dependencies live
//! here.

pub mod domain;
pub mod ports;
pub mod settings;

// Re-export commonly used types for convenience
pub use domain::{
    ConversationReply, PollingStatus, StoredConversation, Timings, MAX_STORED_CONVERSATIONS,
};
pub use ports::{ConversationStore, HistoryError};
pub use settings::{
    validate_settings, Settings, SettingsError, DEFAULT_API_BASE_URL, DEFAULT_CONVERSATION_PATH,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_POLL_TIMEOUT_MS,
};
