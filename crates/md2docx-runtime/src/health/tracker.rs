//! Health transition filter.

use md2docx_core::HealthState;

/// Turns a stream of probe results into state changes.
///
/// Repeated identical results produce nothing, so listeners hear about a
/// flip once rather than on every probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HealthTracker {
    state: HealthState,
}

impl HealthTracker {
    pub const fn new() -> Self {
        Self {
            state: HealthState::Unknown,
        }
    }

    pub const fn state(&self) -> HealthState {
        self.state
    }

    /// Record a probe result. Returns the new state only if it changed.
    pub fn observe(&mut self, healthy: bool) -> Option<HealthState> {
        let next = HealthState::from_probe(healthy);
        if next == self.state {
            return None;
        }
        self.state = next;
        Some(next)
    }

    /// Forget everything; used when the process leaves `Running`.
    pub const fn reset(&mut self) {
        self.state = HealthState::Unknown;
    }
}
