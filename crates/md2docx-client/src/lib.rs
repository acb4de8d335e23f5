#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

mod client;
mod config;
mod error;
mod http;

// ============================================================================
// Public API
// ============================================================================

// Client
pub use client::{ApiClient, ConversionOutcome, HEALTH_PATH, PendingReply};

// Configuration
pub use config::ApiClientConfig;

// Errors
pub use error::{ApiError, ApiErrorKind, ApiResult};

// Transport
pub use http::{HttpBackend, RawResponse, ReqwestBackend, SendError};

// Silence unused dev-dependency warnings
#[cfg(test)]
use axum as _;
