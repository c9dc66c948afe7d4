//! modhost Events - Event bus for the modhost pluggable module host.
//!
//! A host publishes a [`HostEvent`] after every committed structural change
//! (install, uninstall, update). There are two ways to observe them:
//!
//! 1. **Async receivers**: `bus.subscribe()` returns an `EventReceiver`.
//! 2. **Synchronous subscribers**: implementations of `EventSubscriber`
//!    registered with the bus registry are called inline.
//!
//! # Example
//!
//! ```rust
//! use modhost_core::{ModuleId, SlotId};
//! use modhost_events::{EventBus, EventMetadata, HostEvent};
//! use uuid::Uuid;
//!
//! # async fn example() {
//! let bus = EventBus::new();
//! let mut receiver = bus.subscribe();
//!
//! bus.publish(HostEvent::ModuleInstalled {
//!     metadata: EventMetadata::new(Uuid::new_v4(), "erc721-core"),
//!     module: ModuleId::from_static("royalty"),
//!     slot: SlotId::new(0),
//! });
//!
//! let event = receiver.recv().await.unwrap();
//! assert_eq!(event.event_type(), "module_installed");
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod bus;
mod event;
mod subscriber;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus, EventReceiver};
pub use event::{EventMetadata, HostEvent};
pub use subscriber::{
    EventFilter, EventSubscriber, FilterSubscriber, SubscriberId, SubscriberRegistry,
};
