//! Backend process management.
//!
//! - `ports`: choosing the listening port
//! - `executable`: finding what to launch
//! - `supervisor`: launching, crash detection, shutdown
//! - `broadcaster`: fan-out of session events

mod broadcaster;
mod executable;
mod logs;
mod ports;
mod shutdown;
mod supervisor;

pub use broadcaster::SessionEventBroadcaster;
pub use executable::{ExecutableLocator, LaunchSpec, SERVER_PATH_ENV};
pub use logs::{Stream, forward_lines, spawn_log_readers};
pub use ports::{PortAllocator, PortError};
pub use shutdown::{ShutdownOutcome, shutdown_child};
pub use supervisor::{ProcessSupervisor, SupervisorConfig};
