//! Session lifecycle events.
//!
//! Every process start, exit, launch failure and health transition is
//! delivered to listeners as exactly one [`SessionEvent`]. Listeners must
//! not rely on ordering between unrelated events.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{HealthState, ServerEndpoint};

/// Launch and runtime failures of the backend process.
///
/// These are fatal for the current session: the backend must not be
/// presented as usable after any of them.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ProcessFailure {
    /// No candidate executable exists.
    #[error("Backend executable not found (searched {} location(s))", searched.len())]
    ExecutableNotFound {
        /// Every path that was checked, in order
        searched: Vec<String>,
    },

    /// The OS refused to start the process.
    #[error("Failed to launch backend: {reason}")]
    LaunchFailed { reason: String },

    /// The process exited on its own while running.
    #[error("Backend exited unexpectedly (exit code {})", code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    CrashedWithCode {
        /// `None` when terminated by a signal
        code: Option<i32>,
    },

    /// Startup was not confirmed in time.
    #[error("Backend did not start within {timeout_secs}s")]
    SupervisorTimeout { timeout_secs: u64 },

    /// Anything the supervisor could not classify.
    #[error("Backend process error: {reason}")]
    UnknownProcessError { reason: String },
}

/// Lifecycle notification emitted by the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    /// Backend process confirmed started and listening port known.
    ProcessStarted { endpoint: ServerEndpoint },

    /// Backend process is gone, on request or not.
    ProcessStopped {
        #[serde(skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
    },

    /// A lifecycle failure.
    ProcessError { error: ProcessFailure },

    /// Health flipped. Steady-state probe results are not re-announced.
    HealthChanged {
        state: HealthState,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl SessionEvent {
    pub const fn started(endpoint: ServerEndpoint) -> Self {
        Self::ProcessStarted { endpoint }
    }

    pub const fn stopped(exit_code: Option<i32>) -> Self {
        Self::ProcessStopped { exit_code }
    }

    pub const fn error(error: ProcessFailure) -> Self {
        Self::ProcessError { error }
    }

    pub const fn health(state: HealthState, reason: Option<String>) -> Self {
        Self::HealthChanged { state, reason }
    }
}
