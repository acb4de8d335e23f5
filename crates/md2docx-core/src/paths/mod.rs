//! Path utilities for md2docx data and configuration locations.
//!
//! - Data root (`~/.md2docx`, overridable via `MD2DOCX_DATA_DIR`)
//! - Local configuration file discovery relative to the application directory
//!
//! No interactive I/O here; callers decide how to report failures.

mod local_config;

use std::env;
use std::path::{Path, PathBuf};

use crate::error::CoreError;

pub use local_config::LocalConfig;

/// Environment variable that overrides the data root.
pub const DATA_DIR_ENV: &str = "MD2DOCX_DATA_DIR";

/// Name of the local configuration file.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Root directory for md2docx user data (settings, config).
///
/// Resolution order:
/// 1. `MD2DOCX_DATA_DIR` environment variable
/// 2. `~/.md2docx`
pub fn data_root() -> Result<PathBuf, CoreError> {
    if let Some(dir) = env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".md2docx"))
        .ok_or(CoreError::NoHomeDir)
}

/// Candidate locations for the local configuration file, in search order.
///
/// The user's data root comes first, then the application directory and
/// its ancestors, then the development `build/` directories.
pub fn local_config_candidates(app_dir: &Path) -> Vec<PathBuf> {
    let mut candidates = Vec::with_capacity(8);

    if let Ok(root) = data_root() {
        candidates.push(root.join(CONFIG_FILE_NAME));
    }

    candidates.extend(
        [
            "",
            "..",
            "../..",
            "../../..",
            "../build",
            "../../build",
            "../../../build",
        ]
        .iter()
        .map(|rel| app_dir.join(rel).join(CONFIG_FILE_NAME)),
    );

    candidates
}
