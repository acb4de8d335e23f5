//! Command handlers.
//!
//! Handlers follow one pattern:
//! - Signature: `pub async fn execute(ctx: &CliContext, ...) -> Result<()>`
//! - Parse and validate CLI-specific input
//! - Call the session or client
//! - Format output for the terminal
//!
//! Failures are returned as [`CliError`](crate::CliError) so `main` can pick
//! the exit code.

pub mod config;
pub mod convert;
pub mod health;
pub mod serve;
pub mod settings;
