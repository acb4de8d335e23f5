//! Backend liveness.
//!
//! - `checker`: one `GET /health` with its own timeout
//! - `tracker`: filters probe results down to transitions
//! - `monitor`: schedules probes while the process is running

mod checker;
mod monitor;
mod tracker;

pub use checker::{HealthChecker, ProbeError};
pub use monitor::{HealthConfig, HealthMonitor};
pub use tracker::HealthTracker;
