//! Event emitter trait for session lifecycle notifications.
//!
//! Implementations handle transport details (broadcast channels, logging,
//! GUI event loops).

use crate::events::SessionEvent;

/// Trait for emitting session events.
///
/// # Implementations
///
/// - `NoopEmitter` - For tests and contexts without a listener
/// - `SessionEventBroadcaster` (runtime) - fan-out over a broadcast channel
///
/// # Example
///
/// ```ignore
/// fn on_exit(&self, code: Option<i32>, emitter: &dyn SessionEventEmitter) {
///     emitter.emit(SessionEvent::stopped(code));
/// }
/// ```
pub trait SessionEventEmitter: Send + Sync {
    /// Emit a session event.
    ///
    /// This method must not block.
    fn emit(&self, event: SessionEvent);
}

/// A no-op event emitter for tests and CLI contexts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEmitter;

impl NoopEmitter {
    /// Create a new no-op emitter.
    pub const fn new() -> Self {
        Self
    }
}

impl SessionEventEmitter for NoopEmitter {
    fn emit(&self, _event: SessionEvent) {}
}
