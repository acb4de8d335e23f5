//! Local configuration file (`config.json`).
//!
//! The file is owned by the user or the packaging step; this module only
//! reads it. Only the preferred server port matters to the runtime, the
//! other fields seed the backend configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use tracing::debug;

use super::local_config_candidates;
use crate::error::CoreError;

/// Values read from the local configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    pub pandoc_path: Option<String>,
    pub template_file: Option<String>,
    /// Preferred backend port; `None` when absent or outside `1..=65535`.
    #[serde(deserialize_with = "lenient_port")]
    pub server_port: Option<u16>,
    /// File this was loaded from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl LocalConfig {
    /// Parse configuration JSON. Unknown fields are ignored.
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load a specific file.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let raw = fs::read_to_string(path).map_err(|e| CoreError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let mut config = Self::parse(&raw).map_err(|e| CoreError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Load the first existing file from [`local_config_candidates`].
    ///
    /// No file at all is not an error and yields the defaults.
    pub fn discover(app_dir: &Path) -> Result<Self, CoreError> {
        match local_config_candidates(app_dir)
            .into_iter()
            .find(|p| p.is_file())
        {
            Some(path) => {
                debug!(path = %path.display(), "Loading local config");
                Self::load(&path)
            }
            None => {
                debug!(app_dir = %app_dir.display(), "No local config found");
                Ok(Self::default())
            }
        }
    }

    /// Non-empty pandoc path, if configured.
    pub fn pandoc_path(&self) -> Option<&str> {
        self.pandoc_path.as_deref().filter(|p| !p.is_empty())
    }

    /// Non-empty template file, if configured.
    pub fn template_file(&self) -> Option<&str> {
        self.template_file.as_deref().filter(|p| !p.is_empty())
    }
}

fn lenient_port<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(serde_json::Value::as_i64)
        .and_then(|n| u16::try_from(n).ok())
        .filter(|port| *port != 0))
}
