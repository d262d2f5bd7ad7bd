//! Config command handler.
//!
//! Prints the effective configuration after flag, environment, and
//! default resolution. The token is redacted.

use anyhow::Result;

use crate::bootstrap::CliContext;

/// Execute the config command.
pub fn execute(ctx: &CliContext) -> Result<()> {
    let settings = ctx.settings();

    println!("Base URL:          {}", settings.effective_api_base_url());
    println!(
        "Conversation path: {}",
        settings.effective_conversation_path()
    );
    println!(
        "API token:         {}",
        if settings.api_token.is_some() {
            "(set, redacted)"
        } else {
            "(not set)"
        }
    );
    println!(
        "Poll interval:     {} ms",
        settings.effective_poll_interval_ms()
    );
    println!(
        "Poll timeout:      {} ms",
        settings.effective_poll_timeout_ms()
    );
    println!(
        "Cache directory:   {}",
        settings.effective_cache_dir().display()
    );
    println!("History file:      {}", ctx.store().path().display());

    Ok(())
}
