//! Send command handler.
//!
//! Drives the full conversation flow: upload the audio file, poll the
//! backend until the spoken reply is ready, materialize it under a
//! unique local path, and persist the exchange to history.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use parlo_client::{resolve_audio_url, AudioSource, StatusProgress, UploadProgress, UploadRequest};
use parlo_core::{ConversationStore as _, PollingStatus, StoredConversation, Timings};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::bootstrap::CliContext;
use crate::progress;

/// Execute the send command.
pub async fn execute(
    ctx: &CliContext,
    file: &str,
    lang: &str,
    target_lang: &str,
    no_materialize: bool,
) -> Result<()> {
    let request =
        UploadRequest::new(AudioSource::from_file(file)).with_languages(lang, target_lang);

    let bar = progress::upload_bar();
    let on_progress: UploadProgress = {
        let bar = bar.clone();
        Arc::new(move |percent: u8| bar.set_position(u64::from(percent)))
    };

    let reply = match ctx.client().upload(request, Some(on_progress)).await {
        Ok(reply) => {
            bar.finish_and_clear();
            reply
        }
        Err(e) => {
            bar.abandon();
            return Err(e).with_context(|| format!("failed to send '{file}'"));
        }
    };

    println!("You said:  {}", reply.transcript);
    println!("Reply:     {}", reply.reply_text);
    if let Some(timings) = &reply.timings {
        println!("Timings:   {}", format_timings(timings));
    }

    if reply.reply_audio_url.is_empty() {
        println!("(no reply audio was produced)");
        save_history(ctx, &reply, None).await?;
        return Ok(());
    }

    if no_materialize {
        let remote = resolve_audio_url(ctx.client().config(), &reply.reply_audio_url);
        println!("Reply audio: {remote}");
        save_history(ctx, &reply, None).await?;
        return Ok(());
    }

    // Ctrl-C flips the token so the poll session winds down at the
    // next tick instead of leaving a half-written file behind.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let spinner = progress::poll_spinner();
    let on_status: StatusProgress = {
        let spinner = spinner.clone();
        Arc::new(move |status: PollingStatus| progress::render_status(&spinner, &status))
    };

    let audio_path = ctx
        .client()
        .poll_for_audio_cancellable(&reply.reply_audio_url, Some(on_status), &cancel)
        .await;
    spinner.finish_and_clear();
    let audio_path = audio_path.context("reply audio never became ready")?;

    let playable = ctx.client().ensure_unique_path(&audio_path).await;
    debug!(source = %audio_path, playable = %playable, "materialized reply audio");

    println!("Reply audio: {playable}");
    save_history(ctx, &reply, Some(playable)).await?;
    Ok(())
}

async fn save_history(
    ctx: &CliContext,
    reply: &parlo_core::ConversationReply,
    local_audio_path: Option<String>,
) -> Result<()> {
    let record = StoredConversation::from_reply(reply, local_audio_path);
    let id = record.id.clone();
    ctx.store()
        .save(record)
        .await
        .context("failed to save conversation to history")?;
    println!("Saved to history ({id})");
    Ok(())
}

fn format_timings(timings: &Timings) -> String {
    let part = |label: &str, value: Option<f64>| {
        value.map_or_else(|| format!("{label} -"), |v| format!("{label} {v:.2}s"))
    };
    format!(
        "{}  {}  {}",
        part("stt", timings.stt_time),
        part("llm", timings.llm_time),
        part("tts", timings.tts_time),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timings_render_with_gaps() {
        let timings = Timings {
            stt_time: Some(0.5),
            llm_time: None,
            tts_time: Some(1.25),
        };
        assert_eq!(format_timings(&timings), "stt 0.50s  llm -  tts 1.25s");
    }
}
