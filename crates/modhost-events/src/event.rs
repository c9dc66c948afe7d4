//! Event types for the modhost event bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use modhost_core::{ModuleId, SlotId};

/// Metadata attached to every event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// When the event was created.
    pub timestamp: DateTime<Utc>,
    /// Instance id of the host that emitted the event.
    pub host_id: Uuid,
    /// Host type name (from its definition).
    pub source: String,
}

impl EventMetadata {
    /// Create new event metadata.
    #[must_use]
    pub fn new(host_id: Uuid, source: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            host_id,
            source: source.into(),
        }
    }
}

/// Structural changes announced by a module host.
///
/// Events are only published after the change has fully committed; a failed
/// install, uninstall or update never produces one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    /// A module was installed.
    ModuleInstalled {
        /// Event metadata.
        metadata: EventMetadata,
        /// The installed module.
        module: ModuleId,
        /// The slot bound to it.
        slot: SlotId,
    },

    /// A module was uninstalled.
    ModuleUninstalled {
        /// Event metadata.
        metadata: EventMetadata,
        /// The removed module.
        module: ModuleId,
        /// The slot it was bound to. The slot's state is retained.
        slot: SlotId,
    },

    /// A module's implementation was swapped behind its slot.
    ModuleUpdated {
        /// Event metadata.
        metadata: EventMetadata,
        /// The implementation that was replaced.
        previous: ModuleId,
        /// The implementation now bound to the slot.
        module: ModuleId,
        /// The stable slot.
        slot: SlotId,
    },
}

impl HostEvent {
    /// Stable event type name.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ModuleInstalled { .. } => "module_installed",
            Self::ModuleUninstalled { .. } => "module_uninstalled",
            Self::ModuleUpdated { .. } => "module_updated",
        }
    }

    /// Event metadata.
    #[must_use]
    pub fn metadata(&self) -> &EventMetadata {
        match self {
            Self::ModuleInstalled { metadata, .. }
            | Self::ModuleUninstalled { metadata, .. }
            | Self::ModuleUpdated { metadata, .. } => metadata,
        }
    }

    /// The module the event is about (the new implementation for updates).
    #[must_use]
    pub fn module(&self) -> &ModuleId {
        match self {
            Self::ModuleInstalled { module, .. }
            | Self::ModuleUninstalled { module, .. }
            | Self::ModuleUpdated { module, .. } => module,
        }
    }

    /// The slot the event is about.
    #[must_use]
    pub fn slot(&self) -> SlotId {
        match self {
            Self::ModuleInstalled { slot, .. }
            | Self::ModuleUninstalled { slot, .. }
            | Self::ModuleUpdated { slot, .. } => *slot,
        }
    }
}
