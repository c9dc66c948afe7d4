//! The operation table: which slot handles which operation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use modhost_core::{InvocationMode, ModuleId, OperationId, Permission, SlotId};

use crate::error::{HostError, HostResult};

/// Whether an operation is invoked by the host or exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Invoked by the host at a fixed point in its own logic.
    Callback,
    /// Exposed externally and forwarded to the module.
    Fallback,
}

/// One row of the operation table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationEntry {
    /// Slot whose current implementation handles the operation.
    pub slot: SlotId,
    /// Module bound to the slot when the entry was registered.
    pub module: ModuleId,
    /// Callback or fallback.
    pub kind: OperationKind,
    /// Permission a principal needs to dispatch it (fallbacks only).
    pub permission: Option<Permission>,
    /// How the implementation is run.
    pub mode: InvocationMode,
}

/// Map from operation id to its single handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationTable {
    entries: BTreeMap<OperationId, OperationEntry>,
}

impl OperationTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `operation`.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::CallbackConflict`] or
    /// [`HostError::FallbackConflict`] (by the kind of `entry`) if the
    /// operation is already claimed. The existing entry is left untouched.
    pub(crate) fn register(
        &mut self,
        operation: OperationId,
        entry: OperationEntry,
    ) -> HostResult<()> {
        if let Some(existing) = self.entries.get(&operation) {
            let existing = existing.module.clone();
            return Err(match entry.kind {
                OperationKind::Callback => HostError::CallbackConflict {
                    operation,
                    existing,
                },
                OperationKind::Fallback => HostError::FallbackConflict {
                    operation,
                    existing,
                },
            });
        }
        debug!(
            operation = %operation,
            module_id = %entry.module,
            slot = %entry.slot,
            kind = ?entry.kind,
            "Registered operation"
        );
        self.entries.insert(operation, entry);
        Ok(())
    }

    /// Release `operation`, returning its entry.
    pub(crate) fn unregister(&mut self, operation: &OperationId) -> Option<OperationEntry> {
        let removed = self.entries.remove(operation);
        if removed.is_some() {
            debug!(operation = %operation, "Unregistered operation");
        }
        removed
    }

    /// Look up an operation.
    #[must_use]
    pub fn get(&self, operation: &OperationId) -> Option<&OperationEntry> {
        self.entries.get(operation)
    }

    /// Iterate over entries in operation order.
    pub fn iter(&self) -> impl Iterator<Item = (&OperationId, &OperationEntry)> {
        self.entries.iter()
    }

    /// Operations handled by `slot`.
    pub fn operations_for(&self, slot: SlotId) -> impl Iterator<Item = &OperationId> {
        self.entries
            .iter()
            .filter(move |(_, entry)| entry.slot == slot)
            .map(|(op, _)| op)
    }

    /// Number of registered operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(module: &str, slot: u64, kind: OperationKind) -> OperationEntry {
        OperationEntry {
            slot: SlotId::new(slot),
            module: ModuleId::from_static(module),
            kind,
            permission: None,
            mode: InvocationMode::Mutating,
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut table = OperationTable::new();
        table
            .register(
                OperationId::from_static("before_mint"),
                entry("allowlist", 0, OperationKind::Callback),
            )
            .unwrap();
        table
            .register(
                OperationId::from_static("set_fee"),
                entry("fees", 1, OperationKind::Fallback),
            )
            .unwrap();

        assert_eq!(table.len(), 2);
        let found = table.get(&OperationId::from_static("set_fee")).unwrap();
        assert_eq!(found.module.as_str(), "fees");
        let ops: Vec<_> = table.operations_for(SlotId::new(0)).collect();
        assert_eq!(ops, vec![&OperationId::from_static("before_mint")]);
    }

    #[test]
    fn test_conflict_error_follows_new_entry_kind() {
        let mut table = OperationTable::new();
        let op = OperationId::from_static("royalty_info");
        table
            .register(op.clone(), entry("royalty", 0, OperationKind::Fallback))
            .unwrap();

        let err = table
            .register(op.clone(), entry("royalty-v2", 1, OperationKind::Callback))
            .unwrap_err();
        assert!(matches!(
            err,
            HostError::CallbackConflict { ref existing, .. } if existing.as_str() == "royalty"
        ));

        let err = table
            .register(op.clone(), entry("other", 2, OperationKind::Fallback))
            .unwrap_err();
        assert!(matches!(err, HostError::FallbackConflict { .. }));

        // The original claim is untouched.
        assert_eq!(table.get(&op).unwrap().slot, SlotId::new(0));
    }

    #[test]
    fn test_unregister() {
        let mut table = OperationTable::new();
        let op = OperationId::from_static("set_fee");
        table
            .register(op.clone(), entry("fees", 0, OperationKind::Fallback))
            .unwrap();
        assert!(table.unregister(&op).is_some());
        assert!(table.unregister(&op).is_none());
        assert!(table.is_empty());
    }
}
