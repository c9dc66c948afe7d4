//! Host error types.

use modhost_core::{CapabilityId, Caller, ModuleId, OperationId, Payload, Permission};

use crate::module::ModuleError;

/// Errors from host operations.
///
/// Every failure is scoped to the single requested operation: structural
/// changes that fail leave the host exactly as it was, and failed dispatches
/// leave module state untouched.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// A module with this id is already installed.
    #[error("module already installed: {module}")]
    DuplicateModule {
        /// The conflicting module id.
        module: ModuleId,
    },

    /// No module with this id is installed.
    #[error("module not installed: {module}")]
    NotInstalled {
        /// The missing module id.
        module: ModuleId,
    },

    /// A module requires a capability nothing currently provides.
    #[error("module {module} requires unsupported capability {capability}")]
    CapabilityMismatch {
        /// The module being installed or updated.
        module: ModuleId,
        /// The missing capability.
        capability: CapabilityId,
    },

    /// The callback is not part of the host's catalog.
    #[error("callback not supported by this host: {operation}")]
    UnsupportedCallback {
        /// The unknown callback.
        operation: OperationId,
    },

    /// A callback operation is already claimed.
    #[error("callback {operation} is already registered by {existing}")]
    CallbackConflict {
        /// The contested operation.
        operation: OperationId,
        /// The module currently holding it.
        existing: ModuleId,
    },

    /// A fallback operation is already claimed.
    #[error("fallback {operation} is already registered by {existing}")]
    FallbackConflict {
        /// The contested operation.
        operation: OperationId,
        /// The module currently holding it.
        existing: ModuleId,
    },

    /// A required callback has no implementation installed.
    #[error("required callback has no implementation: {operation}")]
    CallbackRequired {
        /// The unimplemented callback.
        operation: OperationId,
    },

    /// No module handles this operation.
    #[error("operation not installed: {operation}")]
    OperationNotInstalled {
        /// The unhandled operation.
        operation: OperationId,
    },

    /// A callback operation was invoked by someone other than the host.
    #[error("callback {operation} may only be invoked by the host, not {caller}")]
    UnauthorizedCallbackInvocation {
        /// The callback operation.
        operation: OperationId,
        /// The rejected caller.
        caller: Caller,
    },

    /// The caller lacks a required permission.
    #[error("{caller} lacks permission {permission}")]
    Unauthorized {
        /// The rejected caller.
        caller: Caller,
        /// The missing permission.
        permission: Permission,
    },

    /// A module's install or uninstall hook failed.
    #[error("lifecycle callback of {module} failed: {source}")]
    LifecycleCallbackFailed {
        /// The module whose hook failed.
        module: ModuleId,
        /// The hook's failure.
        #[source]
        source: ModuleError,
    },

    /// A module rejected a forwarded operation. `data` is the module's
    /// payload, unchanged.
    #[error("{module} failed {operation}: {reason}")]
    ModuleFailed {
        /// The failing module.
        module: ModuleId,
        /// The operation being executed.
        operation: OperationId,
        /// Module-supplied reason.
        reason: String,
        /// Module-supplied failure payload.
        data: Payload,
    },

    /// A forwarded operation failed without a payload.
    #[error("dispatch of {operation} failed")]
    DispatchFailed {
        /// The operation being executed.
        operation: OperationId,
    },

    /// A module attempted to mutate state during a read-only invocation.
    #[error("{module} attempted to mutate state during read-only {operation}")]
    ReadOnlyViolation {
        /// The offending module.
        module: ModuleId,
        /// The read-only operation.
        operation: OperationId,
    },

    /// A non-reentrant callback was invoked while already in flight.
    #[error("callback {operation} is already executing")]
    ReentrantCallback {
        /// The re-entered callback.
        operation: OperationId,
    },

    /// Nested dispatch exceeded the configured depth.
    #[error("call depth limit of {limit} exceeded")]
    CallDepthExceeded {
        /// The configured limit.
        limit: u32,
    },

    /// The per-host slot counter is exhausted.
    #[error("no slot identities left on this host")]
    SlotsExhausted,
}

/// Result type for host operations.
pub type HostResult<T> = Result<T, HostError>;
