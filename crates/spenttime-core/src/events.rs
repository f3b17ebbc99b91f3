//! Domain events emitted after record writes.

use tokio::sync::broadcast;
use tracing::trace;

use crate::{DeleteResult, Record, SaveReason};

/// Capacity of the broadcast channel. Slow subscribers past this lag.
const BROADCAST_CHANNEL_CAPACITY: usize = 1024;

/// Notification published by the record service.
#[derive(Debug, Clone)]
pub enum RecordEvent {
    /// A record was persisted and the cache updated.
    Saved { record: Record, reason: SaveReason },
    /// The repository returned a delete result, successful or not.
    Deleted(DeleteResult),
}

/// Fire-and-forget sink for [`RecordEvent`]s.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: RecordEvent);
}

/// Publishes events over a tokio broadcast channel.
pub struct BroadcastPublisher {
    tx: broadcast::Sender<RecordEvent>,
}

impl BroadcastPublisher {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Subscribe to events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<RecordEvent> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl EventPublisher for BroadcastPublisher {
    fn publish(&self, event: RecordEvent) {
        if self.tx.send(event).is_err() {
            trace!("no subscribers for record event");
        }
    }
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPublisher;

impl EventPublisher for NoopPublisher {
    fn publish(&self, _event: RecordEvent) {}
}
