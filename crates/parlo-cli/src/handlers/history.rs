//! History command handlers.
//!
//! List, delete, and clear operations over the local conversation
//! history file. Timestamps are rendered in local time.

use std::io::{self, Write as _};

use anyhow::{Context as _, Result};
use chrono::{Local, TimeZone};
use parlo_core::{ConversationStore as _, HistoryError, StoredConversation};

use crate::bootstrap::CliContext;

/// Execute the `history list` command.
pub async fn list(ctx: &CliContext, limit: Option<usize>) -> Result<()> {
    let conversations = ctx
        .store()
        .list()
        .await
        .context("failed to read history")?;

    if conversations.is_empty() {
        println!("No stored conversations.");
        println!("Use 'parlo send <file>' to start one.");
        return Ok(());
    }

    let shown = limit.unwrap_or(conversations.len());
    for conversation in conversations.iter().take(shown) {
        print_entry(conversation);
    }
    if shown < conversations.len() {
        println!("... and {} more", conversations.len() - shown);
    }
    Ok(())
}

/// Execute the `history delete` command.
pub async fn delete(ctx: &CliContext, id: &str) -> Result<()> {
    match ctx.store().delete(id).await {
        Ok(()) => {
            println!("Deleted conversation {id}.");
            Ok(())
        }
        Err(HistoryError::NotFound(_)) => {
            println!("No conversation found matching: '{id}'");
            println!("Use 'parlo history list' to see stored conversations.");
            Ok(())
        }
        Err(e) => Err(e).context("failed to delete conversation"),
    }
}

/// Execute the `history clear` command.
pub async fn clear(ctx: &CliContext, force: bool) -> Result<()> {
    let count = ctx
        .store()
        .list()
        .await
        .context("failed to read history")?
        .len();
    if count == 0 {
        println!("History is already empty.");
        return Ok(());
    }

    if !force {
        let confirmed = prompt_confirmation(&format!(
            "Delete all {count} stored conversations?"
        ))?;
        if !confirmed {
            println!("Clear operation cancelled.");
            return Ok(());
        }
    }

    ctx.store().clear().await.context("failed to clear history")?;
    println!("Cleared {count} conversations.");
    Ok(())
}

fn print_entry(conversation: &StoredConversation) {
    let when = Local
        .timestamp_millis_opt(conversation.timestamp)
        .single()
        .map_or_else(
            || conversation.timestamp.to_string(),
            |dt| dt.format("%Y-%m-%d %H:%M").to_string(),
        );

    println!("[{when}] {}", conversation.id);
    println!("  you:   {}", conversation.transcript);
    println!("  reply: {}", conversation.reply_text);
    if let Some(path) = &conversation.local_audio_path {
        println!("  audio: {path}");
    }
}

fn prompt_confirmation(question: &str) -> Result<bool> {
    print!("{question} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
