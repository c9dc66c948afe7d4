//! Slot table: the stable indirection between operations and
//! implementations.
//!
//! Operation entries point at a [`SlotId`], never at an implementation.
//! Updating a module swaps what sits behind the slot; uninstalling clears
//! the binding. Slots are never freed or reused, so state keyed by a slot
//! outlives both.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use modhost_core::{ModuleId, SlotId};

use crate::error::{HostError, HostResult};
use crate::module::Module;

/// What a slot currently points at.
#[derive(Clone)]
pub(crate) struct Binding {
    pub(crate) module: ModuleId,
    pub(crate) implementation: Arc<dyn Module>,
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("module", &self.module)
            .finish_non_exhaustive()
    }
}

/// One indirection point.
#[derive(Debug, Clone)]
pub(crate) struct Slot {
    key: Uuid,
    binding: Option<Binding>,
}

/// All slots allocated by one host.
#[derive(Debug)]
pub(crate) struct SlotTable {
    host_id: Uuid,
    next: u64,
    slots: BTreeMap<SlotId, Slot>,
}

impl SlotTable {
    pub(crate) fn new(host_id: Uuid) -> Self {
        Self {
            host_id,
            next: 0,
            slots: BTreeMap::new(),
        }
    }

    /// Allocate the next slot and bind it.
    pub(crate) fn allocate(&mut self, binding: Binding) -> HostResult<SlotId> {
        let slot = SlotId::new(self.next);
        self.next = self.next.checked_add(1).ok_or(HostError::SlotsExhausted)?;
        let key = slot_key(self.host_id, slot);
        self.slots.insert(
            slot,
            Slot {
                key,
                binding: Some(binding),
            },
        );
        Ok(slot)
    }

    /// Undo the most recent allocation.
    pub(crate) fn deallocate(&mut self, slot: SlotId) {
        if self.slots.remove(&slot).is_some() && slot.index().checked_add(1) == Some(self.next) {
            self.next = slot.index();
        }
    }

    /// Replace a slot's binding, returning the previous one.
    pub(crate) fn rebind(&mut self, slot: SlotId, binding: Option<Binding>) -> Option<Binding> {
        self.slots
            .get_mut(&slot)
            .and_then(|s| std::mem::replace(&mut s.binding, binding))
    }

    pub(crate) fn binding(&self, slot: SlotId) -> Option<&Binding> {
        self.slots.get(&slot).and_then(|s| s.binding.as_ref())
    }

    pub(crate) fn key(&self, slot: SlotId) -> Option<Uuid> {
        self.slots.get(&slot).map(|s| s.key)
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
}

/// Deterministic, host-scoped key of a slot.
///
/// Two hosts allocating the same slot index get different keys.
#[must_use]
pub fn slot_key(host_id: Uuid, slot: SlotId) -> Uuid {
    Uuid::new_v5(&host_id, &slot.index().to_be_bytes())
}
