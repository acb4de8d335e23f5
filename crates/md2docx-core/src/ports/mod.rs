//! Port definitions (trait abstractions) for md2docx.
//!
//! Ports define the interfaces that adapters implement. Core code depends
//! on these traits, never on a concrete transport or storage backend.

mod event_emitter;
mod settings_store;

pub use event_emitter::{NoopEmitter, SessionEventEmitter};
pub use settings_store::SettingsStore;
