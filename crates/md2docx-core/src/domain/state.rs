//! Lifecycle and health states for the supervised backend.
//!
//! The two states are deliberately independent: a backend can be
//! `Running` while still `Unhealthy` during a slow startup.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of the backend process. Written only by the process supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessState {
    /// No launch has been attempted, or the last launch failed.
    #[default]
    NotStarted,
    /// Launch in progress, waiting for the OS to confirm the process.
    Starting,
    /// Process is alive.
    Running,
    /// Graceful shutdown requested.
    Stopping,
    /// Process was stopped on request.
    Stopped,
    /// Process exited on its own while running.
    Crashed,
}

impl ProcessState {
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }

    /// States from which `start()` will attempt a fresh launch.
    pub const fn can_start(self) -> bool {
        matches!(self, Self::NotStarted | Self::Stopped | Self::Crashed)
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotStarted => "not started",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Crashed => "crashed",
        };
        f.write_str(s)
    }
}

/// Liveness of the backend as seen by the health monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    /// No probe has completed since the process (re)entered `Running`.
    #[default]
    Unknown,
    Healthy,
    Unhealthy,
}

impl HealthState {
    pub const fn is_healthy(self) -> bool {
        matches!(self, Self::Healthy)
    }

    pub const fn from_probe(healthy: bool) -> Self {
        if healthy {
            Self::Healthy
        } else {
            Self::Unhealthy
        }
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::Healthy => "healthy",
            Self::Unhealthy => "unhealthy",
        };
        f.write_str(s)
    }
}
