//! Event bus with synchronous listeners and broadcast subscribers

use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

use crate::types::{Event, EventEnvelope};

/// Capacity for the broadcast channel
const DEFAULT_CAPACITY: usize = 1000;

/// Callback invoked synchronously for every published event
pub type Listener = Arc<dyn Fn(&EventEnvelope) + Send + Sync>;

struct Registry {
    listeners: Vec<Listener>,
    next_sequence: u64,
}

/// Event bus for publishing and subscribing to events
///
/// Listeners registered with [`EventBus::on`] run inside `publish`, in
/// registration order. Receivers from [`EventBus::subscribe`] get the same
/// envelopes asynchronously. Publishing is serialized, so sequence numbers
/// match delivery order even when fix tasks publish concurrently. A listener
/// must not publish on the same bus.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
    registry: Arc<Mutex<Registry>>,
}

impl EventBus {
    /// Create a new event bus with default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new event bus with specified capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            registry: Arc::new(Mutex::new(Registry {
                listeners: Vec::new(),
                next_sequence: 0,
            })),
        }
    }

    /// Register a synchronous listener
    pub fn on<F>(&self, listener: F)
    where
        F: Fn(&EventEnvelope) + Send + Sync + 'static,
    {
        self.lock().listeners.push(Arc::new(listener));
    }

    /// Publish an event to all listeners and subscribers
    ///
    /// Returns the number of listeners and subscribers that received it.
    /// With nobody registered the event is dropped and 0 is returned.
    pub fn publish(&self, event: Event) -> usize {
        let mut registry = self.lock();
        let envelope = EventEnvelope::new(registry.next_sequence, event);
        registry.next_sequence += 1;

        for listener in &registry.listeners {
            listener(&envelope);
        }

        registry.listeners.len() + self.sender.send(envelope).unwrap_or(0)
    }

    /// Subscribe to events
    ///
    /// Returns a receiver that will receive all published events.
    /// Note: Events published before subscribing will not be received.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    /// Number of synchronous listeners plus live receivers
    pub fn subscriber_count(&self) -> usize {
        self.lock().listeners.len() + self.sender.receiver_count()
    }

    /// Get the total number of events published
    pub fn event_count(&self) -> u64 {
        self.lock().next_sequence
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Registry> {
        // A panicking listener poisons the lock; the registry itself stays valid.
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .field("event_count", &self.event_count())
            .finish()
    }
}
