//! Host runtime settings.

use modhost_core::Permission;
use modhost_events::DEFAULT_CHANNEL_CAPACITY;

/// Default nesting limit for re-entrant dispatch.
pub const DEFAULT_MAX_CALL_DEPTH: u32 = 32;

/// Tunables of a [`ModuleHost`](crate::ModuleHost).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSettings {
    /// Permission principals need to install, uninstall or update modules.
    pub installer_permission: Permission,
    /// Maximum nesting of dispatches and callbacks.
    pub max_call_depth: u32,
    /// Capacity of the host's event channel.
    pub event_capacity: usize,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            installer_permission: Permission::from_static("installer"),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            event_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl HostSettings {
    /// Set the installer permission.
    #[must_use]
    pub fn with_installer_permission(mut self, permission: Permission) -> Self {
        self.installer_permission = permission;
        self
    }

    /// Set the maximum call depth.
    #[must_use]
    pub fn with_max_call_depth(mut self, depth: u32) -> Self {
        self.max_call_depth = depth;
        self
    }
}

#[cfg(feature = "config")]
impl TryFrom<&modhost_config::Config> for HostSettings {
    type Error = modhost_core::IdError;

    fn try_from(config: &modhost_config::Config) -> Result<Self, Self::Error> {
        Ok(Self {
            installer_permission: Permission::new(config.host.installer_permission.clone())?,
            max_call_depth: config.host.max_call_depth,
            event_capacity: config.events.capacity,
        })
    }
}
