//! Reference-counted capability tracking.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use modhost_core::CapabilityId;

/// Capabilities currently supported by a host, with the number of installed
/// modules providing each.
///
/// Keys whose count drops to zero are removed, so install followed by
/// uninstall leaves the tracker exactly as it was.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilityTracker {
    counts: BTreeMap<CapabilityId, u32>,
}

impl CapabilityTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one more provider of `capability`. Returns the new count.
    pub(crate) fn increment(&mut self, capability: &CapabilityId) -> u32 {
        let count = self.counts.entry(capability.clone()).or_insert(0);
        *count = count.saturating_add(1);
        debug!(capability = %capability, count = *count, "Capability provided");
        *count
    }

    /// Record one fewer provider of `capability`.
    ///
    /// Returns `false` (and changes nothing) if the capability was not
    /// tracked.
    pub(crate) fn decrement(&mut self, capability: &CapabilityId) -> bool {
        let Some(count) = self.counts.get_mut(capability) else {
            warn!(capability = %capability, "Decrement of untracked capability ignored");
            return false;
        };
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.counts.remove(capability);
            debug!(capability = %capability, "Capability no longer supported");
        }
        true
    }

    /// Whether at least one installed module provides `capability`.
    #[must_use]
    pub fn is_supported(&self, capability: &CapabilityId) -> bool {
        self.counts.contains_key(capability)
    }

    /// Number of installed modules providing `capability`.
    #[must_use]
    pub fn count(&self, capability: &CapabilityId) -> u32 {
        self.counts.get(capability).copied().unwrap_or(0)
    }

    /// All supported capabilities in order.
    pub fn supported(&self) -> impl Iterator<Item = &CapabilityId> {
        self.counts.keys()
    }
}
