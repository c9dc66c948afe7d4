//! Synchronous event subscribers.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::event::HostEvent;

/// Filter function type for event subscribers.
pub type EventFilter = Box<dyn Fn(&HostEvent) -> bool + Send + Sync>;

/// Trait for synchronous event subscribers.
///
/// Subscribers run inline on the thread that committed the change, so
/// `on_event` should return quickly.
pub trait EventSubscriber: Send + Sync {
    /// Called when an event is published.
    fn on_event(&self, event: &HostEvent);

    /// Return `true` to receive the event. Accepts everything by default.
    fn accepts(&self, event: &HostEvent) -> bool {
        let _ = event;
        true
    }

    /// Optional name for debugging.
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "anonymous"
    }
}

/// Registration handle for a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Registry for managing synchronous event subscribers.
#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: RwLock<HashMap<SubscriberId, Arc<dyn EventSubscriber>>>,
}

impl std::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("subscriber_count", &self.len())
            .finish()
    }
}

impl SubscriberRegistry {
    /// Create a new subscriber registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber, returning a handle for later removal.
    pub fn register(&self, subscriber: Arc<dyn EventSubscriber>) -> SubscriberId {
        let id = SubscriberId::new();
        debug!(subscriber_name = %subscriber.name(), "Subscriber registered");
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, subscriber);
        id
    }

    /// Unregister a subscriber. Returns `true` if it was present.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        let removed = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some();
        if removed {
            debug!("Subscriber unregistered");
        }
        removed
    }

    /// Notify all accepting subscribers of an event.
    ///
    /// A panicking subscriber is logged and does not affect the others.
    pub fn notify(&self, event: &HostEvent) {
        let subs = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        for (id, subscriber) in subs.iter() {
            if !subscriber.accepts(event) {
                continue;
            }
            trace!(
                subscriber_name = %subscriber.name(),
                event_type = event.event_type(),
                "Notifying subscriber"
            );
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                subscriber.on_event(event);
            }));
            if let Err(e) = result {
                warn!(
                    subscriber_id = ?id,
                    subscriber_name = %subscriber.name(),
                    error = ?e,
                    "Subscriber panicked"
                );
            }
        }
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no subscribers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A closure-backed subscriber with an optional filter.
pub struct FilterSubscriber<F>
where
    F: Fn(&HostEvent) + Send + Sync,
{
    name: String,
    filter: Option<EventFilter>,
    handler: F,
}

impl<F> FilterSubscriber<F>
where
    F: Fn(&HostEvent) + Send + Sync,
{
    /// Create a subscriber that receives every event.
    pub fn new(name: impl Into<String>, handler: F) -> Self {
        Self {
            name: name.into(),
            filter: None,
            handler,
        }
    }

    /// Only deliver events accepted by `filter`.
    #[must_use]
    pub fn with_filter(
        mut self,
        filter: impl Fn(&HostEvent) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }
}

impl<F> EventSubscriber for FilterSubscriber<F>
where
    F: Fn(&HostEvent) + Send + Sync,
{
    fn on_event(&self, event: &HostEvent) {
        (self.handler)(event);
    }

    fn accepts(&self, event: &HostEvent) -> bool {
        self.filter.as_ref().is_none_or(|f| f(event))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use modhost_core::{ModuleId, SlotId};

    use super::*;
    use crate::event::EventMetadata;

    fn installed(module: &str) -> HostEvent {
        HostEvent::ModuleInstalled {
            metadata: EventMetadata::new(Uuid::new_v4(), "test-host"),
            module: ModuleId::from_static(module),
            slot: SlotId::new(0),
        }
    }

    #[test]
    fn test_register_notify_unregister() {
        let registry = SubscriberRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let id = registry.register(Arc::new(FilterSubscriber::new("collector", move |e| {
            sink.lock().unwrap().push(e.module().to_string());
        })));
        assert_eq!(registry.len(), 1);

        registry.notify(&installed("fees"));
        assert_eq!(*seen.lock().unwrap(), vec!["fees".to_string()]);

        assert!(registry.unregister(id));
        assert!(!registry.unregister(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_filter_skips_events() {
        let registry = SubscriberRegistry::new();
        let seen = Arc::new(Mutex::new(0_usize));
        let sink = Arc::clone(&seen);

        registry.register(Arc::new(
            FilterSubscriber::new("royalty-only", move |_| {
                *sink.lock().unwrap() += 1;
            })
            .with_filter(|e| e.module().as_str() == "royalty"),
        ));

        registry.notify(&installed("fees"));
        registry.notify(&installed("royalty"));
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[test]
    fn test_panicking_subscriber_is_isolated() {
        let registry = SubscriberRegistry::new();
        let seen = Arc::new(Mutex::new(0_usize));
        let sink = Arc::clone(&seen);

        registry.register(Arc::new(FilterSubscriber::new("boom", |_| {
            panic!("subscriber failure");
        })));
        registry.register(Arc::new(FilterSubscriber::new("counter", move |_| {
            *sink.lock().unwrap() += 1;
        })));

        registry.notify(&installed("fees"));
        assert_eq!(*seen.lock().unwrap(), 1);
    }
}
