//! Command handler implementations.
//!
//! Each handler takes the [`crate::bootstrap::CliContext`] plus its
//! command arguments and returns `anyhow::Result<()>`.

pub mod config;
pub mod history;
pub mod send;
