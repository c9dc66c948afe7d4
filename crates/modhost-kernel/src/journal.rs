//! Undo journal for structural changes.
//!
//! Install, uninstall and update record every mutation they make. On
//! failure the journal is replayed backwards, leaving the host exactly as it
//! was before the call.

use tracing::warn;

use modhost_core::{CapabilityId, ModuleId, OperationId, SlotId};

use crate::host::HostCore;
use crate::operations::OperationEntry;
use crate::registry::InstalledModule;
use crate::slots::Binding;
use crate::state::{ModuleStorage, StateStore};

/// One reversible mutation.
#[derive(Debug)]
pub(crate) enum Undo {
    ModuleAdded(ModuleId),
    ModuleRemoved(InstalledModule),
    CapabilityIncremented(CapabilityId),
    CapabilityDecremented(CapabilityId),
    OperationRegistered(OperationId),
    OperationUnregistered(OperationId, OperationEntry),
    SlotAllocated(SlotId),
    SlotRebound(SlotId, Option<Binding>),
    StorageReplaced(SlotId, Option<ModuleStorage>),
}

#[derive(Debug, Default)]
pub(crate) struct Journal {
    entries: Vec<Undo>,
}

impl Journal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, undo: Undo) {
        self.entries.push(undo);
    }

    /// Revert every recorded mutation, newest first.
    pub(crate) fn rollback(self, core: &mut HostCore, state: &mut StateStore) {
        warn!(steps = self.entries.len(), "Rolling back structural change");
        for undo in self.entries.into_iter().rev() {
            match undo {
                Undo::ModuleAdded(id) => {
                    core.registry.remove(&id);
                },
                Undo::ModuleRemoved(module) => {
                    core.registry.insert(module);
                },
                Undo::CapabilityIncremented(capability) => {
                    core.capabilities.decrement(&capability);
                },
                Undo::CapabilityDecremented(capability) => {
                    core.capabilities.increment(&capability);
                },
                Undo::OperationRegistered(operation) => {
                    core.operations.unregister(&operation);
                },
                Undo::OperationUnregistered(operation, entry) => {
                    if let Err(e) = core.operations.register(operation, entry) {
                        warn!(error = %e, "Failed to restore operation during rollback");
                    }
                },
                Undo::SlotAllocated(slot) => {
                    core.slots.deallocate(slot);
                    state.discard(slot);
                },
                Undo::SlotRebound(slot, previous) => {
                    core.slots.rebind(slot, previous);
                },
                Undo::StorageReplaced(slot, Some(storage)) => {
                    state.replace(slot, storage);
                },
                Undo::StorageReplaced(slot, None) => {
                    state.discard(slot);
                },
            }
        }
    }
}
