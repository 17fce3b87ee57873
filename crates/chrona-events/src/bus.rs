use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrona_types::{RecordId, Timestamp};
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::{EventError, EventResult};
use crate::event::{EventKind, EventPayload, VaultEvent};

/// Default capacity of each subscriber's channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Filter for subscribing to a subset of vault events.
#[derive(Clone, Debug, Default)]
pub struct EventFilter {
    /// If set, only events of these kinds are delivered.
    pub kinds: Option<Vec<EventKind>>,
    /// If set, only events about these records are delivered.
    pub records: Option<Vec<RecordId>>,
}

impl EventFilter {
    pub fn kinds(kinds: impl Into<Vec<EventKind>>) -> Self {
        Self {
            kinds: Some(kinds.into()),
            ..Default::default()
        }
    }

    pub fn matches(&self, event: &VaultEvent) -> bool {
        if let Some(ref kinds) = self.kinds {
            if !kinds.contains(&event.kind()) {
                return false;
            }
        }
        if let Some(ref records) = self.records {
            match event.payload.record_id() {
                Some(id) if records.contains(&id) => {}
                _ => return false,
            }
        }
        true
    }
}

/// A broadcast channel receiver for vault events.
pub type EventStream = broadcast::Receiver<VaultEvent>;

struct Subscriber {
    filter: EventFilter,
    sender: broadcast::Sender<VaultEvent>,
}

/// Fan-out bus delivering events to matching subscribers.
///
/// Publishing never blocks and never fails for lack of subscribers. A slow
/// subscriber that falls more than `capacity` events behind observes
/// `RecvError::Lagged` on its stream.
pub struct EventBus {
    capacity: usize,
    seq: AtomicU64,
    subscribers: RwLock<Vec<Subscriber>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            seq: AtomicU64::new(0),
            subscribers: RwLock::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, filter: EventFilter) -> EventResult<EventStream> {
        let (sender, rx) = broadcast::channel(self.capacity);
        self.subscribers
            .write()
            .map_err(|_| EventError::Poisoned)?
            .push(Subscriber { filter, sender });
        Ok(rx)
    }

    /// Stamp `payload` with the next sequence number and deliver it.
    ///
    /// Subscribers whose receivers were dropped are pruned.
    pub fn publish(&self, emitted_at: Timestamp, payload: EventPayload) -> EventResult<VaultEvent> {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let event = VaultEvent::new(seq, emitted_at, payload)?;

        let mut subs = self.subscribers.write().map_err(|_| EventError::Poisoned)?;
        subs.retain(|sub| {
            if sub.filter.matches(&event) {
                sub.sender.send(event.clone()).is_ok()
            } else {
                sub.sender.receiver_count() > 0
            }
        });
        debug!(id = %event.id, kind = %event.kind(), seq, subscribers = subs.len(), "event published");
        Ok(event)
    }

    pub fn subscriber_count(&self) -> EventResult<usize> {
        Ok(self
            .subscribers
            .read()
            .map_err(|_| EventError::Poisoned)?
            .len())
    }

    /// Number of events published so far.
    pub fn published(&self) -> u64 {
        self.seq.load(Ordering::SeqCst)
    }
}
