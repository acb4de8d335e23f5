//! Settings store trait definition.
//!
//! Replaces a process-wide settings singleton: whoever needs preferences
//! receives a handle explicitly. Window geometry and other purely visual
//! state are not part of this surface.

use std::path::PathBuf;

use crate::error::CoreError;
use crate::settings::{MAX_RECENT_FILES, SettingsData, default_document_dir};

/// Read/write access to persisted user preferences.
///
/// Implementations provide [`snapshot`](Self::snapshot) and
/// [`update`](Self::update); the typed getters and setters are built on
/// top of those two. Getters never fail, setters report persistence
/// failures.
///
/// # Design Rules
///
/// - Object-safe, shared as `Arc<dyn SettingsStore>`
/// - Directory getters fall back to the user's documents directory
pub trait SettingsStore: Send + Sync {
    /// Current stored values.
    fn snapshot(&self) -> SettingsData;

    /// Apply `change` and persist the result.
    fn update(&self, change: &mut dyn FnMut(&mut SettingsData)) -> Result<(), CoreError>;

    fn last_input_dir(&self) -> PathBuf {
        self.snapshot()
            .last_input_dir
            .unwrap_or_else(default_document_dir)
    }

    fn set_last_input_dir(&self, dir: PathBuf) -> Result<(), CoreError> {
        self.update(&mut |s| s.last_input_dir = Some(dir.clone()))
    }

    fn last_output_dir(&self) -> PathBuf {
        self.snapshot()
            .last_output_dir
            .unwrap_or_else(default_document_dir)
    }

    fn set_last_output_dir(&self, dir: PathBuf) -> Result<(), CoreError> {
        self.update(&mut |s| s.last_output_dir = Some(dir.clone()))
    }

    fn last_template_dir(&self) -> PathBuf {
        self.snapshot()
            .last_template_dir
            .unwrap_or_else(default_document_dir)
    }

    fn set_last_template_dir(&self, dir: PathBuf) -> Result<(), CoreError> {
        self.update(&mut |s| s.last_template_dir = Some(dir.clone()))
    }

    /// Last directory used for batch input selection.
    fn last_multi_input_dir(&self) -> PathBuf {
        self.snapshot()
            .last_multi_input_dir
            .unwrap_or_else(default_document_dir)
    }

    fn set_last_multi_input_dir(&self, dir: PathBuf) -> Result<(), CoreError> {
        self.update(&mut |s| s.last_multi_input_dir = Some(dir.clone()))
    }

    fn pandoc_path(&self) -> Option<String> {
        self.snapshot().pandoc_path.filter(|p| !p.is_empty())
    }

    fn set_pandoc_path(&self, path: Option<String>) -> Result<(), CoreError> {
        self.update(&mut |s| s.pandoc_path.clone_from(&path))
    }

    fn template_file(&self) -> Option<PathBuf> {
        self.snapshot().template_file
    }

    fn set_template_file(&self, file: Option<PathBuf>) -> Result<(), CoreError> {
        self.update(&mut |s| s.template_file.clone_from(&file))
    }

    fn use_template(&self) -> bool {
        self.snapshot().use_template
    }

    fn set_use_template(&self, use_template: bool) -> Result<(), CoreError> {
        self.update(&mut |s| s.use_template = use_template)
    }

    /// Most recent first.
    fn recent_files(&self) -> Vec<PathBuf> {
        self.snapshot().recent_files
    }

    /// Move `file` to the front of the recent list, trimming to
    /// [`MAX_RECENT_FILES`]. Empty paths are ignored.
    fn add_recent_file(&self, file: PathBuf) -> Result<(), CoreError> {
        if file.as_os_str().is_empty() {
            return Ok(());
        }
        self.update(&mut |s| {
            s.recent_files.retain(|f| f != &file);
            s.recent_files.insert(0, file.clone());
            s.recent_files.truncate(MAX_RECENT_FILES);
        })
    }

    fn clear_recent_files(&self) -> Result<(), CoreError> {
        self.update(&mut |s| s.recent_files.clear())
    }

    /// Drop every stored preference.
    fn reset_to_defaults(&self) -> Result<(), CoreError> {
        self.update(&mut |s| *s = SettingsData::default())
    }
}
