//! Core error type shared by domain constructors and file-backed adapters.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by core domain operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A batch conversion was requested with no input files.
    #[error("Batch conversion requires at least one input file")]
    EmptyBatch,

    /// Validation error (invalid input).
    #[error("Validation error: {0}")]
    Validation(String),

    /// A configuration or settings file could not be read or parsed.
    #[error("Configuration error in {}: {reason}", path.display())]
    Config {
        /// File that failed to load
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },

    /// The user's home directory could not be determined.
    #[error("Could not determine home directory")]
    NoHomeDir,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_message_includes_path() {
        let err = CoreError::Config {
            path: PathBuf::from("/tmp/config.json"),
            reason: "expected value at line 1".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/tmp/config.json"));
        assert!(msg.contains("expected value"));
    }

    #[test]
    fn test_empty_batch_message() {
        assert!(CoreError::EmptyBatch.to_string().contains("at least one"));
    }
}
