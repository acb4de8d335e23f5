//! Settings storage implementations.
//!
//! `SettingsData` is the persisted shape. `MemorySettingsStore` keeps it in
//! memory; `JsonSettingsStore` mirrors every change to a JSON file.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::paths::data_root;
use crate::ports::SettingsStore;

/// Maximum number of entries kept in the recent-files list.
pub const MAX_RECENT_FILES: usize = 10;

/// File name of the settings store inside the data root.
const SETTINGS_FILE_NAME: &str = "settings.json";

/// Persisted user preferences.
///
/// All fields are optional so a partial or older file still loads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsData {
    pub last_input_dir: Option<PathBuf>,
    pub last_output_dir: Option<PathBuf>,
    pub last_template_dir: Option<PathBuf>,
    pub last_multi_input_dir: Option<PathBuf>,
    pub pandoc_path: Option<String>,
    pub template_file: Option<PathBuf>,
    pub use_template: bool,
    pub recent_files: Vec<PathBuf>,
}

/// Fallback for directory preferences that were never set.
pub(crate) fn default_document_dir() -> PathBuf {
    dirs::document_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// In-memory settings, discarded on drop.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    data: Mutex<SettingsData>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(data: SettingsData) -> Self {
        Self {
            data: Mutex::new(data),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn snapshot(&self) -> SettingsData {
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update(&self, change: &mut dyn FnMut(&mut SettingsData)) -> Result<(), CoreError> {
        change(&mut self.data.lock().unwrap_or_else(PoisonError::into_inner));
        Ok(())
    }
}

/// Settings persisted as pretty-printed JSON.
///
/// The file is rewritten (via a temporary sibling and rename) on every
/// update. A missing file loads as defaults.
#[derive(Debug)]
pub struct JsonSettingsStore {
    path: PathBuf,
    data: Mutex<SettingsData>,
}

impl JsonSettingsStore {
    /// Open the store at `~/.md2docx/settings.json`.
    pub fn open_default() -> Result<Self, CoreError> {
        Self::open(data_root()?.join(SETTINGS_FILE_NAME))
    }

    /// Open the store at `path`, loading existing values if present.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let path = path.into();
        let data = if path.exists() {
            let raw = fs::read_to_string(&path).map_err(|e| CoreError::Config {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            serde_json::from_str(&raw).map_err(|e| CoreError::Config {
                path: path.clone(),
                reason: e.to_string(),
            })?
        } else {
            debug!(path = %path.display(), "Settings file not found, using defaults");
            SettingsData::default()
        };

        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    /// Open the store, falling back to defaults if the file is corrupt.
    ///
    /// The corrupt file is left untouched until the next successful write.
    pub fn open_or_default(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::open(&path) {
            Ok(store) => store,
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable settings file");
                Self {
                    path,
                    data: Mutex::new(SettingsData::default()),
                }
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, data: &SettingsData) -> Result<(), CoreError> {
        let to_config_err = |e: &dyn std::fmt::Display| CoreError::Config {
            path: self.path.clone(),
            reason: e.to_string(),
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| to_config_err(&e))?;
        }

        let json = serde_json::to_string_pretty(data).map_err(|e| to_config_err(&e))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| to_config_err(&e))?;
        fs::rename(&tmp, &self.path).map_err(|e| to_config_err(&e))
    }
}

impl SettingsStore for JsonSettingsStore {
    fn snapshot(&self) -> SettingsData {
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update(&self, change: &mut dyn FnMut(&mut SettingsData)) -> Result<(), CoreError> {
        let mut guard = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = guard.clone();
        change(&mut next);
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }
}
