//! Configuration and settings subcommands.

use clap::Subcommand;

/// Backend configuration commands.
#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the backend's current configuration
    Show {
        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Change backend configuration values
    Set {
        /// Path to the pandoc executable
        #[arg(long)]
        pandoc_path: Option<String>,
        /// Default reference template
        #[arg(long)]
        template_file: Option<String>,
        /// Port the backend should use next time it starts
        #[arg(long)]
        server_port: Option<u16>,
    },
    /// Ask the backend to validate its configuration
    Validate,
}

/// Local settings commands.
#[derive(Subcommand)]
pub enum SettingsCommand {
    /// Show stored preferences
    Show,
    /// Remember a template and use it by default
    UseTemplate {
        /// Template file; omit to stop using a template
        template: Option<std::path::PathBuf>,
    },
    /// Forget the recent files list
    ClearRecent,
    /// Drop every stored preference
    Reset,
}
