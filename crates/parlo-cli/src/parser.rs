//! Main CLI parser and top-level argument handling.
//!
//! This module defines the root CLI structure with global options.

use clap::Parser;

use crate::commands::Commands;

/// Command-line interface definition for the parlo conversation tool.
///
/// This is the top-level parser that handles global options and
/// dispatches to subcommands.
#[derive(Parser)]
#[command(name = "parlo")]
#[command(about = "Talk to a parlo conversation backend from the terminal")]
#[command(version)]
pub struct Cli {
    /// Override the backend base URL for this invocation
    #[arg(long = "base-url", global = true, env = "PARLO_API_BASE_URL")]
    pub base_url: Option<String>,

    /// Bearer token for authenticated backends
    #[arg(long = "token", global = true, env = "PARLO_API_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_args_parse() {
        let cli = Cli::parse_from([
            "parlo",
            "--verbose",
            "--base-url",
            "http://10.0.0.5:8000",
            "config",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.base_url, Some("http://10.0.0.5:8000".to_string()));
    }
}
