//! Shared helpers for integration tests.

use modhost_kernel::{CapabilityTracker, ModuleHost, ModuleRegistry, OperationTable, StateStore};

/// Everything observable about a host's bookkeeping, for before/after
/// comparisons.
#[derive(Debug, Clone, PartialEq)]
pub struct HostSnapshot {
    pub registry: ModuleRegistry,
    pub operations: OperationTable,
    pub capabilities: CapabilityTracker,
    pub state: StateStore,
}

impl HostSnapshot {
    pub fn of(host: &ModuleHost) -> Self {
        Self {
            registry: host.registry().clone(),
            operations: host.operations().clone(),
            capabilities: host.capabilities().clone(),
            state: host.state().clone(),
        }
    }
}
