//! Session event broadcasting.
//!
//! Fan-out of [`SessionEvent`]s to any number of listeners. Slow listeners
//! lag (and are told so by the channel) rather than blocking the emitter.

use md2docx_core::{SessionEvent, SessionEventEmitter};
use tokio::sync::broadcast;
use tracing::debug;

/// Broadcast channel capacity for session events
const CHANNEL_CAPACITY: usize = 64;

/// Broadcaster for session lifecycle events.
#[derive(Debug, Clone)]
pub struct SessionEventBroadcaster {
    sender: broadcast::Sender<SessionEvent>,
}

impl SessionEventBroadcaster {
    /// Create a new broadcaster
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Broadcast an event to all current subscribers
    pub fn broadcast(&self, event: SessionEvent) {
        debug!(?event, "Session event");
        // No receivers is fine; events are not replayed
        let _ = self.sender.send(event);
    }

    /// Subscribe to events emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Get number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for SessionEventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionEventEmitter for SessionEventBroadcaster {
    fn emit(&self, event: SessionEvent) {
        self.broadcast(event);
    }
}
