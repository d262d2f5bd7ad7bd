//! Main commands enum and primary subcommands.

use clap::Subcommand;

use crate::history_commands::HistoryCommand;

/// Available commands for the parlo conversation tool.
#[derive(Subcommand)]
pub enum Commands {
    /// Send an audio file to the backend and wait for the spoken reply
    Send {
        /// Path to the audio file to send (wav, mp3, m4a, ogg, flac, webm)
        file: String,
        /// Language of the recorded speech
        #[arg(long, default_value = "en")]
        lang: String,
        /// Language the reply should be produced in
        #[arg(long = "target-lang", default_value = "en")]
        target_lang: String,
        /// Skip downloading the reply audio; print the remote URL instead
        #[arg(long = "no-materialize")]
        no_materialize: bool,
    },

    /// Inspect or prune the local conversation history
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },

    /// Show the effective resolved configuration
    Config,
}
