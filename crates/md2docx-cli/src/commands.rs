//! Main commands enum and primary subcommands.

use std::path::PathBuf;

use clap::Subcommand;

use crate::config_commands::{ConfigCommand, SettingsCommand};

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Run the backend in the foreground until Ctrl-C
    Serve,

    /// Convert a single Markdown file
    Convert {
        /// Markdown file to convert
        input: PathBuf,
        /// Directory for the output (defaults to the input's directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Output file name (defaults to the input name with .docx)
        #[arg(short = 'n', long)]
        output_name: Option<String>,
        /// Reference .docx template
        #[arg(short, long, conflicts_with = "no_template")]
        template: Option<PathBuf>,
        /// Ignore the template stored in settings
        #[arg(long)]
        no_template: bool,
    },

    /// Convert several Markdown files in one request
    Batch {
        /// Markdown files to convert (duplicates are dropped)
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,
        /// Directory for the outputs
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Reference .docx template
        #[arg(short, long, conflicts_with = "no_template")]
        template: Option<PathBuf>,
        /// Ignore the template stored in settings
        #[arg(long)]
        no_template: bool,
    },

    /// Inspect or change the backend configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Check whether a backend answers on its health endpoint
    Health,

    /// Inspect or reset locally stored preferences
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
}
