//! JSON-file implementation of the `ConversationStore` port.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::warn;

use parlo_core::{ConversationStore, HistoryError, StoredConversation, MAX_STORED_CONVERSATIONS};

/// Default location of the history file under the platform data
/// directory.
#[must_use]
pub fn default_history_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("parlo")
        .join("history.json")
}

/// Conversation history persisted as a single JSON file.
///
/// Every operation reads the whole list, modifies it, and writes it
/// back. An interior async mutex serializes writers, so concurrent
/// saves from multiple tasks cannot interleave read-modify-write
/// cycles.
pub struct JsonHistoryStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonHistoryStore {
    /// Create a store backed by the given file. The file and its
    /// parent directory are created lazily on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Create a store at the platform default location.
    #[must_use]
    pub fn at_default_path() -> Self {
        Self::new(default_history_path())
    }

    /// The backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Vec<StoredConversation>, HistoryError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                // a corrupt file is surfaced, not silently truncated
                HistoryError::Serialization(format!("{}: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(HistoryError::Storage(format!("{}: {e}", self.path.display()))),
        }
    }

    async fn write_all(&self, conversations: &[StoredConversation]) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| HistoryError::Storage(format!("{}: {e}", parent.display())))?;
        }
        let json = serde_json::to_vec_pretty(conversations)
            .map_err(|e| HistoryError::Serialization(e.to_string()))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| HistoryError::Storage(format!("{}: {e}", self.path.display())))
    }
}

#[async_trait]
impl ConversationStore for JsonHistoryStore {
    async fn list(&self) -> Result<Vec<StoredConversation>, HistoryError> {
        let _guard = self.lock.lock().await;
        self.read_all().await
    }

    async fn save(&self, conversation: StoredConversation) -> Result<(), HistoryError> {
        let _guard = self.lock.lock().await;
        let mut conversations = self.read_all().await?;
        conversations.insert(0, conversation);
        if conversations.len() > MAX_STORED_CONVERSATIONS {
            let evicted = conversations.len() - MAX_STORED_CONVERSATIONS;
            warn!(evicted, "history cap reached; dropping oldest records");
            conversations.truncate(MAX_STORED_CONVERSATIONS);
        }
        self.write_all(&conversations).await
    }

    async fn delete(&self, id: &str) -> Result<(), HistoryError> {
        let _guard = self.lock.lock().await;
        let mut conversations = self.read_all().await?;
        let before = conversations.len();
        conversations.retain(|c| c.id != id);
        if conversations.len() == before {
            return Err(HistoryError::NotFound(id.to_string()));
        }
        self.write_all(&conversations).await
    }

    async fn clear(&self) -> Result<(), HistoryError> {
        let _guard = self.lock.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(HistoryError::Storage(format!("{}: {e}", self.path.display()))),
        }
    }
}
