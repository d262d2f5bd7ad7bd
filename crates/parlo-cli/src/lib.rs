//! CLI crate for parlo.
//!
//! Parser, command definitions, bootstrap, and handlers live here;
//! `main.rs` only parses arguments and dispatches.

pub mod bootstrap;
pub mod commands;
pub mod handlers;
pub mod history_commands;
pub mod parser;
pub mod progress;

pub use bootstrap::{bootstrap, CliContext};
pub use commands::Commands;
pub use history_commands::HistoryCommand;
pub use parser::Cli;
