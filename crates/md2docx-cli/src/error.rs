//! CLI-specific error types and mappings.
//!
//! Maps library errors to exit codes and user-facing messages.

use md2docx_client::{ApiError, ApiErrorKind};
use md2docx_core::CoreError;
use md2docx_runtime::SessionError;
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Anything without a more specific category.
    #[error("{0}")]
    General(String),

    /// Argument validation error.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// IO error (file not found, permission denied, etc.).
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration or settings error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The backend could not be reached or never became ready.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// The backend process could not be launched or died.
    #[error("Process error: {0}")]
    Process(String),

    /// The backend answered with a malformed reply.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The backend reported that the conversion failed.
    #[error("Conversion failed: {0}")]
    Conversion(String),
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow Unix conventions:
    /// - 0: Success
    /// - 1: General error
    /// - 2: Misuse of shell command (invalid arguments)
    /// - 64-78: Reserved for specific error categories (see sysexits.h)
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::General(_) | Self::Conversion(_) => 1,
            Self::Arguments(_) => 2,
            Self::Unavailable(_) => 69, // EX_UNAVAILABLE
            Self::Process(_) => 71,     // EX_OSERR
            Self::Io(_) => 74,          // EX_IOERR
            Self::Protocol(_) => 76,    // EX_PROTOCOL
            Self::Config(_) => 78,      // EX_CONFIG
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::EmptyBatch | CoreError::Validation(_) => Self::Arguments(err.to_string()),
            CoreError::Config { .. } | CoreError::NoHomeDir => Self::Config(err.to_string()),
        }
    }
}

impl From<ApiError> for CliError {
    fn from(err: ApiError) -> Self {
        match err.kind() {
            ApiErrorKind::Transport => Self::Unavailable(err.to_string()),
            ApiErrorKind::Decode => Self::Protocol(err.to_string()),
            ApiErrorKind::Semantic => Self::General(err.to_string()),
        }
    }
}

impl From<SessionError> for CliError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Client(api) => api.into(),
            SessionError::Process(failure) => Self::Process(failure.to_string()),
            SessionError::Port(_) | SessionError::NotReady { .. } | SessionError::Timeout(_) => {
                Self::Unavailable(err.to_string())
            }
            SessionError::InvalidUrl(_) => Self::Arguments(err.to_string()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
