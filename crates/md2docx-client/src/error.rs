//! Error types for backend API calls.
//!
//! The three variants must stay distinguishable: callers tell a network
//! problem from a malformed payload from a backend that said "no".

use std::fmt;

use thiserror::Error;

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Coarse classification of an [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    Transport,
    Decode,
    Semantic,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Transport => "transport",
            Self::Decode => "decode",
            Self::Semantic => "semantic",
        };
        f.write_str(s)
    }
}

/// Errors delivered to the issuer of a single API call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request did not produce a usable HTTP exchange.
    ///
    /// Connection refused, timeout and DNS failures have no `status`.
    /// A non-2xx reply carries its status code.
    #[error("{operation} failed: {detail}")]
    Transport {
        /// Operation name, e.g. `"get config"`
        operation: &'static str,
        /// HTTP status when the backend answered with an error status
        status: Option<u16>,
        detail: String,
    },

    /// The backend answered but the body was not what we expected.
    #[error("{operation}: malformed response: {detail}")]
    Decode {
        operation: &'static str,
        detail: String,
    },

    /// Well-formed reply whose own outcome field reports failure.
    #[error("{message}")]
    Semantic { message: String },
}

impl ApiError {
    pub const fn kind(&self) -> ApiErrorKind {
        match self {
            Self::Transport { .. } => ApiErrorKind::Transport,
            Self::Decode { .. } => ApiErrorKind::Decode,
            Self::Semantic { .. } => ApiErrorKind::Semantic,
        }
    }

    /// HTTP status, for transport errors caused by an error reply.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }

    pub(crate) fn transport(operation: &'static str, detail: impl Into<String>) -> Self {
        Self::Transport {
            operation,
            status: None,
            detail: detail.into(),
        }
    }

    pub(crate) fn decode(operation: &'static str, detail: impl fmt::Display) -> Self {
        Self::Decode {
            operation,
            detail: detail.to_string(),
        }
    }

    pub(crate) fn semantic(message: impl Into<String>) -> Self {
        Self::Semantic {
            message: message.into(),
        }
    }
}
