//! Main CLI parser and top-level argument handling.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Convert Markdown to Word documents through the md2docx backend.
///
/// By default each command launches its own backend and stops it when done.
/// Pass `--url` to use a backend that is already running.
#[derive(Parser)]
#[command(name = "md2docx")]
#[command(about = "Convert Markdown to Word documents via the md2docx backend")]
#[command(version)]
pub struct Cli {
    /// Backend executable to launch instead of searching next to this binary
    #[arg(long = "server", env = "MD2DOCX_SERVER_PATH", global = true)]
    pub server: Option<PathBuf>,

    /// Preferred port for a launched backend (overrides the local config file)
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Use an already running backend at this URL instead of launching one
    #[arg(long, env = "MD2DOCX_URL", global = true, conflicts_with = "server")]
    pub url: Option<String>,

    /// Seconds to wait for the backend to become healthy
    #[arg(long = "ready-timeout", default_value_t = 15, global = true)]
    pub ready_timeout: u64,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}
