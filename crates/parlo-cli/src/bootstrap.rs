//! CLI bootstrap - the composition root.
//!
//! Resolves settings (flags over environment over defaults), validates
//! them, and wires the conversation client and the history store
//! together. All handlers go through [`CliContext`]; nothing outside
//! this module constructs infrastructure.

use anyhow::Context as _;
use parlo_client::{ClientConfig, ConversationClient, DefaultConversationClient};
use parlo_core::{validate_settings, Settings};
use parlo_history::JsonHistoryStore;

use crate::parser::Cli;

/// Shared dependencies for command handlers.
pub struct CliContext {
    settings: Settings,
    client: DefaultConversationClient,
    store: JsonHistoryStore,
}

impl CliContext {
    /// The fully resolved settings for this invocation.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The conversation client.
    pub fn client(&self) -> &DefaultConversationClient {
        &self.client
    }

    /// The history store.
    pub fn store(&self) -> &JsonHistoryStore {
        &self.store
    }
}

/// Build the CLI context from parsed arguments and the environment.
pub fn bootstrap(cli: &Cli) -> anyhow::Result<CliContext> {
    let overrides = Settings {
        api_base_url: cli.base_url.clone(),
        api_token: cli.token.clone(),
        ..Settings::default()
    };
    let settings = overrides.or(Settings::from_env());
    validate_settings(&settings).context("invalid configuration")?;

    let config = ClientConfig::from_settings(&settings);
    let client = ConversationClient::new(config);

    let store = match &settings.history_path {
        Some(path) => JsonHistoryStore::new(path.clone()),
        None => JsonHistoryStore::at_default_path(),
    };

    Ok(CliContext {
        settings,
        client,
        store,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn flag_overrides_win_over_defaults() {
        let cli = Cli::parse_from(["parlo", "--base-url", "http://box:9000/", "config"]);
        let ctx = bootstrap(&cli).unwrap();
        assert_eq!(ctx.settings().effective_api_base_url(), "http://box:9000");
    }
}
