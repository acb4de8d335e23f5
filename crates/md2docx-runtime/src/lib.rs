#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

pub mod health;
pub mod process;
mod session;

// ============================================================================
// Public API
// ============================================================================

// Session
pub use session::{ServerSession, SessionConfig, SessionError};

// Process management
pub use process::{
    ExecutableLocator, LaunchSpec, PortAllocator, PortError, ProcessSupervisor, SERVER_PATH_ENV,
    SessionEventBroadcaster, SupervisorConfig,
};

// Health
pub use health::{HealthChecker, HealthConfig, HealthMonitor, HealthTracker, ProbeError};
