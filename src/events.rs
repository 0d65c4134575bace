//! Event broadcasting for factory failures.
//!
//! Factory `create` and `destroy` rejections are consumed by the engine so
//! they cannot poison unrelated waiters; they are re-published here for
//! operators. The [`EventBus`] is backed by `tokio::sync::broadcast`.

use tokio::sync::broadcast;

/// Events emitted by the pool.
///
/// Subscribers receive cloned copies via [`EventBus::subscribe`].
#[derive(Debug, Clone)]
pub enum PoolEvent {
    /// A factory `create` call failed. The failed creation does not consume
    /// a capacity slot; dispensing continues with another attempt.
    CreateError {
        /// Human-readable error description.
        error: String,
    },
    /// A factory `destroy` call failed or timed out. The resource was
    /// already removed from the pool's accounting.
    DestroyError {
        /// Human-readable error description.
        error: String,
    },
}

/// Broadcast-based event bus for pool events.
///
/// Emission is fire-and-forget: if no subscribers are listening or the
/// channel is full, events are dropped without backpressure on the engine.
pub struct EventBus {
    sender: broadcast::Sender<PoolEvent>,
}

impl EventBus {
    /// Create a new event bus with the given buffer size.
    #[must_use]
    pub fn new(buffer_size: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer_size);
        Self { sender }
    }

    /// Emit an event to all current subscribers.
    ///
    /// Non-blocking. If there are no subscribers, the event is dropped.
    pub fn emit(&self, event: PoolEvent) {
        // send only fails when nobody is subscribed; that is fine here.
        let _ = self.sender.send(event);
    }

    /// Subscribe to events emitted after this call.
    ///
    /// A subscriber that falls behind by more than the buffer size receives
    /// a `Lagged` error and skips to the latest event.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PoolEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.sender.receiver_count())
            .finish()
    }
}
