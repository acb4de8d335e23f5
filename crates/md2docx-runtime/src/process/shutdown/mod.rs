//! Graceful backend shutdown.
//!
//! `shutdown_child` asks the process to exit, waits, then force-kills it.

mod child;

pub use child::{ShutdownOutcome, shutdown_child};
