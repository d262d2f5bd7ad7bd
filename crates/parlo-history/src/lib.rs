//! File-backed conversation history for parlo.
//!
//! Implements the [`ConversationStore`] port over a single JSON file:
//! an ordered list of the most recent conversations, newest first,
//! capped at [`parlo_core::MAX_STORED_CONVERSATIONS`] with
//! FIFO-by-insertion eviction.

mod store;

pub use store::{default_history_path, JsonHistoryStore};

// Re-export the port so consumers need only this crate for storage.
pub use parlo_core::{ConversationStore, HistoryError};
