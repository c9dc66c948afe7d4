//! Event bus for broadcasting host events to subscribers.

use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{debug, warn};

use crate::event::HostEvent;
use crate::subscriber::SubscriberRegistry;

/// Channel capacity used by [`EventBus::new`].
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Event bus for broadcasting host events.
///
/// Async receivers get events through a broadcast channel, in publish
/// order. Synchronous subscribers registered in the [`SubscriberRegistry`]
/// are shared across clones and run inline during `publish`.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Arc<HostEvent>>,
    registry: Arc<SubscriberRegistry>,
    capacity: usize,
}

impl EventBus {
    /// Bus with [`DEFAULT_CHANNEL_CAPACITY`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Bus holding up to `capacity` undelivered events per receiver.
    ///
    /// A capacity of zero is raised to one, the broadcast channel minimum.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            registry: Arc::new(SubscriberRegistry::new()),
            capacity,
        }
    }

    /// Publish an event to async receivers, then to synchronous
    /// subscribers.
    ///
    /// Returns the number of async receivers that got the event.
    pub fn publish(&self, event: HostEvent) -> usize {
        let event = Arc::new(event);
        let delivered = self.sender.send(Arc::clone(&event)).unwrap_or(0);
        debug!(
            event_type = event.event_type(),
            module_id = %event.module(),
            slot = %event.slot(),
            receivers = delivered,
            "Published host event"
        );
        self.registry.notify(&event);
        delivered
    }

    /// Subscribe to events published after this call.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver::new(self.sender.subscribe())
    }

    /// Synchronous subscribers, shared by all clones.
    #[must_use]
    pub fn registry(&self) -> &SubscriberRegistry {
        &self.registry
    }

    /// Number of active subscribers (async and synchronous).
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender
            .receiver_count()
            .saturating_add(self.registry.len())
    }

    /// Channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Async handle on the host event stream.
pub struct EventReceiver {
    receiver: broadcast::Receiver<Arc<HostEvent>>,
}

impl std::fmt::Debug for EventReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventReceiver")
            .field("pending", &self.receiver.len())
            .finish()
    }
}

impl EventReceiver {
    pub(crate) fn new(receiver: broadcast::Receiver<Arc<HostEvent>>) -> Self {
        Self { receiver }
    }

    /// Receive the next event.
    ///
    /// Lagged events are skipped with a warning. Returns `None` once every
    /// sender has been dropped.
    pub async fn recv(&mut self) -> Option<Arc<HostEvent>> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => lagged(skipped),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next queued event, if any.
    pub fn try_recv(&mut self) -> Option<Arc<HostEvent>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => lagged(skipped),
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}

fn lagged(skipped: u64) {
    warn!(skipped, "Event receiver fell behind, oldest host events dropped");
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use modhost_core::{ModuleId, SlotId};
    use uuid::Uuid;

    use super::*;
    use crate::event::EventMetadata;
    use crate::subscriber::FilterSubscriber;

    fn installed(module: &'static str, slot: u64) -> HostEvent {
        HostEvent::ModuleInstalled {
            metadata: EventMetadata::new(Uuid::new_v4(), "test-host"),
            module: ModuleId::from_static(module),
            slot: SlotId::new(slot),
        }
    }

    #[tokio::test]
    async fn test_event_bus_creation() {
        let bus = EventBus::new();
        assert_eq!(bus.capacity(), DEFAULT_CHANNEL_CAPACITY);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let bus = EventBus::with_capacity(0);
        assert_eq!(bus.capacity(), 1);
    }

    #[tokio::test]
    async fn test_publish_and_receive() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();

        let delivered = bus.publish(installed("fees", 0));
        assert_eq!(delivered, 1);

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.event_type(), "module_installed");
        assert_eq!(event.module().as_str(), "fees");
    }

    #[tokio::test]
    async fn test_events_arrive_in_order() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();

        bus.publish(installed("alpha", 0));
        bus.publish(installed("beta", 1));

        assert_eq!(receiver.recv().await.unwrap().slot(), SlotId::new(0));
        assert_eq!(receiver.recv().await.unwrap().slot(), SlotId::new(1));
        assert!(receiver.try_recv().is_none());
    }

    #[test]
    fn test_publish_without_receivers() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(installed("fees", 0)), 0);
    }

    #[test]
    fn test_clone_shares_channel_and_registry() {
        let bus = EventBus::new();
        let clone = bus.clone();
        let mut receiver = bus.subscribe();

        let hits = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&hits);
        bus.registry()
            .register(Arc::new(FilterSubscriber::new("counter", move |_| {
                sink.fetch_add(1, Ordering::SeqCst);
            })));

        clone.publish(installed("fees", 0));

        assert!(receiver.try_recv().is_some());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(clone.subscriber_count(), 2);
    }

    #[test]
    fn test_lagged_receiver_recovers() {
        let bus = EventBus::with_capacity(2);
        let mut receiver = bus.subscribe();

        for slot in 0..5 {
            bus.publish(installed("fees", slot));
        }

        // The oldest events were overwritten; the newest remain.
        let first = receiver.try_recv().unwrap();
        assert_eq!(first.slot(), SlotId::new(3));
        assert_eq!(receiver.try_recv().unwrap().slot(), SlotId::new(4));
        assert!(receiver.try_recv().is_none());
    }
}
