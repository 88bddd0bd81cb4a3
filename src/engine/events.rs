//! Engine event bus.
//!
//! Out-of-band signals from the orchestration engine to any subscriber,
//! normally the presentation layer. Backed by a tokio broadcast channel;
//! dropping a receiver releases the subscription.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use super::types::TERMINAL_PROGRESS;

/// Default broadcast channel capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Events published by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A catalog refresh discovered versions not present in the prior
    /// snapshot for an installed project.
    NewVersionsFound {
        /// Number of newly discovered versions.
        count: usize,
    },
    /// Progress of the active session. A `progress` of -1 terminates the
    /// session regardless of `total`.
    UpdateProgress {
        /// Completed step count, or -1 on termination.
        progress: i64,
        /// Total step count for the session.
        total: i64,
    },
}

impl EngineEvent {
    /// Returns true for the terminal progress sentinel.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EngineEvent::UpdateProgress {
                progress: TERMINAL_PROGRESS,
                ..
            }
        )
    }
}

/// Broadcast-based publish/subscribe channel for [`EngineEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    /// Creates a bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribes to engine events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    /// Subscribes to engine events as a `Stream`.
    #[must_use]
    pub fn stream(&self) -> BroadcastStream<EngineEvent> {
        BroadcastStream::new(self.tx.subscribe())
    }

    /// Publishes an event to all subscribers.
    pub fn emit(&self, event: EngineEvent) {
        // Ignore send errors (no subscribers)
        let _ = self.tx.send(event);
    }

    /// Returns the number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
