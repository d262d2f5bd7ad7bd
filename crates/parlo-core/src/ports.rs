//! Port definitions.
//!
//! Ports are the traits infrastructure crates implement. The only port
//! the conversation core needs is history persistence.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::StoredConversation;

/// Errors that can occur in history operations.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Conversation not found: {0}")]
    NotFound(String),

    #[error("History storage error: {0}")]
    Storage(String),

    #[error("History serialization error: {0}")]
    Serialization(String),
}

/// Port for conversation history persistence.
///
/// Implementations must serialize concurrent writers; callers may save
/// from multiple tasks at once.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// List stored conversations, newest first.
    async fn list(&self) -> Result<Vec<StoredConversation>, HistoryError>;

    /// Save a record at the head of the list, evicting the oldest
    /// entries beyond [`crate::MAX_STORED_CONVERSATIONS`].
    async fn save(&self, conversation: StoredConversation) -> Result<(), HistoryError>;

    /// Delete the record with the given id.
    async fn delete(&self, id: &str) -> Result<(), HistoryError>;

    /// Remove all records.
    async fn clear(&self) -> Result<(), HistoryError>;
}
