//! Settings command handler.
//!
//! Works on the local settings store only; no backend is involved.

use std::path::PathBuf;

use anyhow::Result;
use md2docx_core::SettingsStore;

use crate::bootstrap::CliContext;
use crate::config_commands::SettingsCommand;
use crate::error::CliError;

/// Execute the settings command.
pub fn execute(ctx: &CliContext, command: SettingsCommand) -> Result<()> {
    let store = ctx.settings();
    match command {
        SettingsCommand::Show => {
            let snapshot = store.snapshot();
            let json = serde_json::to_string_pretty(&snapshot)
                .map_err(|e| CliError::General(e.to_string()))?;
            println!("{json}");
        }
        SettingsCommand::UseTemplate { template } => {
            use_template(store, template.clone())?;
            match template {
                Some(path) => println!("✓ Using template {}", path.display()),
                None => println!("✓ Templates disabled"),
            }
        }
        SettingsCommand::ClearRecent => {
            store.clear_recent_files().map_err(CliError::from)?;
            println!("✓ Recent files cleared");
        }
        SettingsCommand::Reset => {
            store.reset_to_defaults().map_err(CliError::from)?;
            println!("✓ Settings reset");
        }
    }
    Ok(())
}

/// Store `template` and turn template use on, or turn it off for `None`.
pub fn use_template(store: &dyn SettingsStore, template: Option<PathBuf>) -> Result<(), CliError> {
    if let Some(dir) = template.as_deref().and_then(|t| t.parent()) {
        if !dir.as_os_str().is_empty() {
            store.set_last_template_dir(dir.to_path_buf())?;
        }
    }
    store.set_use_template(template.is_some())?;
    if template.is_some() {
        store.set_template_file(template)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use md2docx_core::MemorySettingsStore;

    #[test]
    fn test_use_template_enables_and_remembers_dir() {
        let store = MemorySettingsStore::new();
        use_template(&store, Some(PathBuf::from("/templates/report.docx"))).unwrap();

        assert!(store.use_template());
        assert_eq!(store.template_file(), Some(PathBuf::from("/templates/report.docx")));
        assert_eq!(store.last_template_dir(), PathBuf::from("/templates"));
    }

    #[test]
    fn test_disabling_keeps_stored_template() {
        let store = MemorySettingsStore::new();
        use_template(&store, Some(PathBuf::from("/templates/report.docx"))).unwrap();
        use_template(&store, None).unwrap();

        assert!(!store.use_template());
        assert_eq!(store.template_file(), Some(PathBuf::from("/templates/report.docx")));
    }
}
