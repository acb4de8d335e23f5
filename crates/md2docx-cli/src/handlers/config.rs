//! Config command handler.
//!
//! Reads, updates and validates the configuration held by the backend.

use anyhow::Result;
use md2docx_client::{ApiClient, ApiErrorKind};
use md2docx_core::ConfigData;

use crate::bootstrap::CliContext;
use crate::config_commands::ConfigCommand;
use crate::error::CliError;

/// Execute the config command.
pub async fn execute(ctx: &CliContext, command: ConfigCommand) -> Result<()> {
    let session = ctx.connect().await?;
    let result = match session.client() {
        Ok(client) => run(&client, command).await,
        Err(e) => Err(e.into()),
    };
    session.stop().await;
    result.map_err(Into::into)
}

async fn run(client: &ApiClient, command: ConfigCommand) -> Result<(), CliError> {
    match command {
        ConfigCommand::Show { json } => {
            let config = client.get_config().await?;
            if json {
                let raw = serde_json::to_string_pretty(&config)
                    .map_err(|e| CliError::General(e.to_string()))?;
                println!("{raw}");
            } else {
                print_config(&config);
            }
        }
        ConfigCommand::Set {
            pandoc_path,
            template_file,
            server_port,
        } => {
            let current = client.get_config().await?;
            let updated = apply_changes(current, pandoc_path, template_file, server_port);
            let ack = client.update_config(&updated).await?;
            println!("✓ {}", ack.as_deref().unwrap_or("Configuration saved"));
            print_config(&updated);
        }
        ConfigCommand::Validate => match client.validate_config().await {
            Ok(message) => println!("✓ {message}"),
            Err(e) if e.kind() == ApiErrorKind::Semantic => {
                return Err(CliError::Config(e.to_string()));
            }
            Err(e) => return Err(e.into()),
        },
    }
    Ok(())
}

/// Overlay the given values on `current`.
pub fn apply_changes(
    mut current: ConfigData,
    pandoc_path: Option<String>,
    template_file: Option<String>,
    server_port: Option<u16>,
) -> ConfigData {
    if let Some(path) = pandoc_path {
        current.pandoc_path = path;
    }
    if let Some(template) = template_file {
        current.template_file = template;
    }
    if let Some(port) = server_port {
        current.server_port = port;
    }
    current
}

fn print_config(config: &ConfigData) {
    let or_unset = |s: &str| if s.is_empty() { "(not set)".to_string() } else { s.to_string() };
    println!("Pandoc path:   {}", or_unset(&config.pandoc_path));
    println!("Template file: {}", or_unset(&config.template_file));
    println!("Server port:   {}", config.server_port);
}
