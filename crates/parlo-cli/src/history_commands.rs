//! History management subcommands.

use clap::Subcommand;

/// History command variants.
#[derive(Subcommand)]
pub enum HistoryCommand {
    /// List stored conversations, newest first
    List {
        /// Limit the number of entries shown
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Delete a single conversation by id
    Delete {
        /// Id of the conversation to delete (see `parlo history list`)
        id: String,
    },
    /// Delete all stored conversations
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}
