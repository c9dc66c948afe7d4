//! Dispatch router.
//!
//! Routes operations to the slot that handles them, enforcing the
//! callback-origin rule and fallback permissions, and runs the module with
//! an [`InvocationContext`] bound to the slot's host-owned storage.

use std::fmt;

use tracing::{debug, warn};

use modhost_core::{Caller, InvocationMode, ModuleId, OperationId, Payload, SlotId};

use crate::access::{AccessControl, caller_has};
use crate::callback::CallbackOutcome;
use crate::error::{HostError, HostResult};
use crate::host::HostCore;
use crate::module::ModuleError;
use crate::operations::{OperationEntry, OperationKind};
use crate::state::{ModuleStorage, StateStore, WriteLog};

static EMPTY_STORAGE: ModuleStorage = ModuleStorage::new();

/// Frames of the current top-level request.
#[derive(Debug, Default)]
pub(crate) struct CallStack {
    depth: u32,
    in_flight: Vec<OperationId>,
    writes: WriteLog,
}

impl CallStack {
    fn enter(&mut self, operation: &OperationId, guarded: bool) {
        self.depth = self.depth.saturating_add(1);
        if guarded {
            self.in_flight.push(operation.clone());
        }
    }

    fn exit(&mut self, guarded: bool) {
        self.depth = self.depth.saturating_sub(1);
        if guarded {
            self.in_flight.pop();
        }
    }

    fn is_in_flight(&self, operation: &OperationId) -> bool {
        self.in_flight.contains(operation)
    }
}

/// The immutable half of a host, borrowed for the duration of one request.
#[derive(Clone, Copy)]
pub(crate) struct Router<'a> {
    pub(crate) core: &'a HostCore,
    pub(crate) access: &'a dyn AccessControl,
    pub(crate) max_depth: u32,
}

impl<'a> Router<'a> {
    /// Route `operation` on behalf of `caller`.
    pub(crate) fn dispatch(
        self,
        state: &mut StateStore,
        stack: &mut CallStack,
        caller: &Caller,
        operation: &OperationId,
        args: Payload,
        read_only: bool,
    ) -> HostResult<Payload> {
        let entry = self.core.operations.get(operation).ok_or_else(|| {
            debug!(operation = %operation, "No module handles operation");
            HostError::OperationNotInstalled {
                operation: operation.clone(),
            }
        })?;

        match entry.kind {
            OperationKind::Callback if !caller.is_host() => {
                warn!(
                    operation = %operation,
                    caller = %caller,
                    "Rejected external callback invocation"
                );
                return Err(HostError::UnauthorizedCallbackInvocation {
                    operation: operation.clone(),
                    caller: caller.clone(),
                });
            },
            OperationKind::Fallback => {
                if let Some(permission) = &entry.permission
                    && !caller_has(self.access, caller, permission)
                {
                    warn!(
                        operation = %operation,
                        caller = %caller,
                        permission = %permission,
                        "Rejected dispatch: missing permission"
                    );
                    return Err(HostError::Unauthorized {
                        caller: caller.clone(),
                        permission: permission.clone(),
                    });
                }
            },
            OperationKind::Callback => {},
        }

        self.invoke(state, stack, operation, entry, args, read_only)
    }

    /// Forward to the implementation behind `entry.slot`.
    ///
    /// Writes made by the unit (and anything it called) are undone if the
    /// module fails, so a failed unit leaves no trace even when an outer
    /// module swallows the error.
    pub(crate) fn invoke(
        self,
        state: &mut StateStore,
        stack: &mut CallStack,
        operation: &OperationId,
        entry: &'a OperationEntry,
        args: Payload,
        read_only: bool,
    ) -> HostResult<Payload> {
        if stack.depth >= self.max_depth {
            warn!(operation = %operation, limit = self.max_depth, "Call depth exceeded");
            return Err(HostError::CallDepthExceeded {
                limit: self.max_depth,
            });
        }

        let guarded = entry.kind == OperationKind::Callback
            && self
                .core
                .catalog
                .get(operation)
                .is_some_and(|c| c.non_reentrant);
        if guarded && stack.is_in_flight(operation) {
            warn!(operation = %operation, "Rejected re-entrant callback");
            return Err(HostError::ReentrantCallback {
                operation: operation.clone(),
            });
        }

        let binding = self.core.slots.binding(entry.slot).ok_or_else(|| {
            HostError::OperationNotInstalled {
                operation: operation.clone(),
            }
        })?;

        let read_only = read_only || entry.mode == InvocationMode::ReadOnly;
        let mark = stack.writes.mark();

        debug!(
            operation = %operation,
            module_id = %binding.module,
            slot = %entry.slot,
            depth = stack.depth,
            read_only,
            "Forwarding operation"
        );

        stack.enter(operation, guarded);
        let result = {
            let mut ctx = InvocationContext {
                router: self,
                state: &mut *state,
                stack: &mut *stack,
                module: &binding.module,
                slot: entry.slot,
                operation,
                read_only,
            };
            binding.implementation.invoke(operation, args, &mut ctx)
        };
        stack.exit(guarded);

        result.map_err(|err| {
            stack.writes.revert_to(mark, state);
            let err = into_host_error(&binding.module, operation, err);
            debug!(operation = %operation, error = %err, "Forwarded operation failed");
            err
        })
    }
}

/// Map a module failure to what the caller sees.
fn into_host_error(module: &ModuleId, operation: &OperationId, err: ModuleError) -> HostError {
    match err {
        ModuleError::Revert { reason, data } => HostError::ModuleFailed {
            module: module.clone(),
            operation: operation.clone(),
            reason,
            data,
        },
        ModuleError::Opaque => HostError::DispatchFailed {
            operation: operation.clone(),
        },
        ModuleError::Host(inner) => *inner,
    }
}

/// What a module sees while executing a routed operation.
///
/// The context hands out the slot's storage (never another slot's) and lets
/// the module call back into the host. Calls made through the context run
/// as [`Caller::Host`] and inherit the read-only flag.
pub struct InvocationContext<'a> {
    router: Router<'a>,
    state: &'a mut StateStore,
    stack: &'a mut CallStack,
    module: &'a ModuleId,
    slot: SlotId,
    operation: &'a OperationId,
    read_only: bool,
}

impl fmt::Debug for InvocationContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationContext")
            .field("module", self.module)
            .field("slot", &self.slot)
            .field("operation", self.operation)
            .field("read_only", &self.read_only)
            .field("depth", &self.stack.depth)
            .finish_non_exhaustive()
    }
}

impl InvocationContext<'_> {
    /// The module being executed.
    #[must_use]
    pub fn module_id(&self) -> &ModuleId {
        self.module
    }

    /// The module's slot.
    #[must_use]
    pub fn slot(&self) -> SlotId {
        self.slot
    }

    /// The operation being executed.
    #[must_use]
    pub fn operation(&self) -> &OperationId {
        self.operation
    }

    /// Whether writes are rejected.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Current nesting depth (1 for a top-level request).
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.stack.depth
    }

    /// Read access to the slot's storage.
    #[must_use]
    pub fn storage(&self) -> &ModuleStorage {
        self.state.get(self.slot).unwrap_or(&EMPTY_STORAGE)
    }

    /// Read one value from the slot's storage.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Payload> {
        self.storage().get(key)
    }

    fn check_writable(&self) -> HostResult<()> {
        if self.read_only {
            warn!(
                module_id = %self.module,
                operation = %self.operation,
                "Rejected write during read-only invocation"
            );
            return Err(HostError::ReadOnlyViolation {
                module: self.module.clone(),
                operation: self.operation.clone(),
            });
        }
        Ok(())
    }

    /// Write one value, returning the previous one.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::ReadOnlyViolation`] during read-only execution.
    pub fn set(&mut self, key: impl Into<String>, value: Payload) -> HostResult<Option<Payload>> {
        self.check_writable()?;
        Ok(self
            .state
            .set_logged(self.slot, key.into(), value, &mut self.stack.writes))
    }

    /// Remove one value, returning it.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::ReadOnlyViolation`] during read-only execution.
    pub fn remove(&mut self, key: &str) -> HostResult<Option<Payload>> {
        self.check_writable()?;
        Ok(self
            .state
            .remove_logged(self.slot, key, &mut self.stack.writes))
    }

    /// Dispatch another operation as the host.
    ///
    /// # Errors
    ///
    /// Any routing or module failure of the nested call. Its state changes
    /// are already undone when this returns an error.
    pub fn dispatch(&mut self, operation: &OperationId, args: Payload) -> HostResult<Payload> {
        self.router.dispatch(
            self.state,
            self.stack,
            &Caller::Host,
            operation,
            args,
            self.read_only,
        )
    }

    /// Execute a host callback from inside a module.
    ///
    /// # Errors
    ///
    /// Same as [`ModuleHost::execute_callback`](crate::ModuleHost::execute_callback).
    pub fn execute_callback(
        &mut self,
        operation: &OperationId,
        args: Payload,
    ) -> HostResult<CallbackOutcome> {
        self.router
            .execute_callback(self.state, self.stack, operation, args, self.read_only)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_call_stack_tracks_guarded_frames() {
        let op = OperationId::from_static("before_transfer");
        let mut stack = CallStack::default();

        stack.enter(&op, true);
        assert_eq!(stack.depth, 1);
        assert!(stack.is_in_flight(&op));

        stack.enter(&OperationId::from_static("set_fee"), false);
        assert_eq!(stack.depth, 2);

        stack.exit(false);
        stack.exit(true);
        assert_eq!(stack.depth, 0);
        assert!(!stack.is_in_flight(&op));
    }

    #[test]
    fn test_revert_keeps_payload() {
        let err = into_host_error(
            &ModuleId::from_static("allowlist"),
            &OperationId::from_static("before_mint"),
            ModuleError::revert_with("not on allowlist", json!({"account": "0xabc"})),
        );
        match err {
            HostError::ModuleFailed {
                module,
                reason,
                data,
                ..
            } => {
                assert_eq!(module.as_str(), "allowlist");
                assert_eq!(reason, "not on allowlist");
                assert_eq!(data, json!({"account": "0xabc"}));
            },
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_opaque_becomes_generic_failure() {
        let err = into_host_error(
            &ModuleId::from_static("fees"),
            &OperationId::from_static("withdraw"),
            ModuleError::Opaque,
        );
        assert!(matches!(err, HostError::DispatchFailed { .. }));
    }

    #[test]
    fn test_nested_host_error_is_unwrapped() {
        let err = into_host_error(
            &ModuleId::from_static("fees"),
            &OperationId::from_static("withdraw"),
            HostError::CallDepthExceeded { limit: 4 }.into(),
        );
        assert!(matches!(err, HostError::CallDepthExceeded { limit: 4 }));
    }
}
