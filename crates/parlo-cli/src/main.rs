//! CLI entry point - the composition root.
//!
//! Loads the environment, parses arguments, wires dependencies through
//! bootstrap, and dispatches to handlers.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use parlo_cli::{bootstrap, Cli, Commands, HistoryCommand, handlers};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env participates in settings resolution, so load it before
    // parsing (clap reads env-backed flags during parse)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let ctx = bootstrap(&cli)?;

    let Some(command) = cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Send {
            file,
            lang,
            target_lang,
            no_materialize,
        } => handlers::send::execute(&ctx, &file, &lang, &target_lang, no_materialize).await,
        Commands::History { command } => match command {
            HistoryCommand::List { limit } => handlers::history::list(&ctx, limit).await,
            HistoryCommand::Delete { id } => handlers::history::delete(&ctx, &id).await,
            HistoryCommand::Clear { force } => handlers::history::clear(&ctx, force).await,
        },
        Commands::Config => handlers::config::execute(&ctx),
    }
}
