//! Conversation client.
//!
//! The client is constructed once from a [`ClientConfig`] and injected
//! wherever the conversation flow is driven; there is no process-wide
//! instance. It is generic over an HTTP backend so tests can script
//! the transport.

use crate::config::ClientConfig;
use crate::http::{HttpBackend, ReqwestBackend};

/// Default conversation client using the reqwest HTTP backend.
pub type DefaultConversationClient = ConversationClient<ReqwestBackend>;

/// Client for the conversation API: upload audio, poll the reply audio
/// URL for readiness, download and materialize the reply locally.
///
/// The generic parameter `B` is an implementation detail for testing;
/// production code uses [`DefaultConversationClient`].
pub struct ConversationClient<B: HttpBackend> {
    pub(crate) backend: B,
    pub(crate) config: ClientConfig,
}

impl DefaultConversationClient {
    /// Create a client with the given configuration.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        let backend = ReqwestBackend::new(&config);
        Self { backend, config }
    }
}

impl<B: HttpBackend> ConversationClient<B> {
    /// The configuration this client was built from.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Create a client with a custom backend, for tests.
    #[cfg(test)]
    pub(crate) const fn with_backend(config: ClientConfig, backend: B) -> Self {
        Self { backend, config }
    }
}
