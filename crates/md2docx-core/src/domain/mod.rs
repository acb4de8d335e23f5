//! Domain types for the conversion backend integration.
//!
//! These are pure value types with no infrastructure dependencies.

mod config;
mod conversion;
mod endpoint;
mod state;

pub use config::{ConfigData, DEFAULT_SERVER_PORT};
pub use conversion::{
    BatchConversionRequest, ConversionRequest, ConversionResponse, ConversionResult,
};
pub use endpoint::ServerEndpoint;
pub use state::{HealthState, ProcessState};
