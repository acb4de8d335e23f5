#![doc = include_str!("../README.md")]
#![deny(unused_crate_dependencies)]

pub mod domain;
mod error;
pub mod events;
pub mod paths;
pub mod ports;
pub mod settings;

// Re-export commonly used types for convenience
pub use domain::{
    BatchConversionRequest, ConfigData, ConversionRequest, ConversionResponse, ConversionResult,
    DEFAULT_SERVER_PORT, HealthState, ProcessState, ServerEndpoint,
};
pub use error::CoreError;
pub use events::{ProcessFailure, SessionEvent};
pub use paths::{LocalConfig, data_root, local_config_candidates};
pub use ports::{NoopEmitter, SessionEventEmitter, SettingsStore};
pub use settings::{JsonSettingsStore, MAX_RECENT_FILES, MemorySettingsStore, SettingsData};
