//! Callback invoker: how a host calls out to modules at its fixed points.

use serde::{Deserialize, Serialize};
use tracing::debug;

use modhost_core::{OperationId, Payload};

use crate::dispatch::{CallStack, Router};
use crate::error::{HostError, HostResult};
use crate::state::StateStore;

/// Result of executing a host callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "payload", rename_all = "snake_case")]
pub enum CallbackOutcome {
    /// An installed module handled the callback.
    Executed(Payload),
    /// The callback is optional and nothing implements it.
    Skipped,
}

impl CallbackOutcome {
    /// Whether a module ran.
    #[must_use]
    pub fn is_executed(&self) -> bool {
        matches!(self, Self::Executed(_))
    }

    /// Whether the callback was skipped.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }

    /// The module's result, if one ran.
    #[must_use]
    pub fn into_payload(self) -> Option<Payload> {
        match self {
            Self::Executed(payload) => Some(payload),
            Self::Skipped => None,
        }
    }
}

impl Router<'_> {
    /// Execute a catalog callback as the host.
    pub(crate) fn execute_callback(
        self,
        state: &mut StateStore,
        stack: &mut CallStack,
        operation: &OperationId,
        args: Payload,
        read_only: bool,
    ) -> HostResult<CallbackOutcome> {
        let catalog_entry =
            self.core
                .catalog
                .get(operation)
                .ok_or_else(|| HostError::UnsupportedCallback {
                    operation: operation.clone(),
                })?;

        let Some(entry) = self.core.operations.get(operation) else {
            if catalog_entry.is_required() {
                return Err(HostError::CallbackRequired {
                    operation: operation.clone(),
                });
            }
            debug!(operation = %operation, "Optional callback not implemented, skipping");
            return Ok(CallbackOutcome::Skipped);
        };

        self.invoke(state, stack, operation, entry, args, read_only)
            .map(CallbackOutcome::Executed)
    }
}
