//! The module trait and module-side error types.

use modhost_core::{Caller, ModuleId, ModuleManifest, OperationId, Payload, SlotId};

use crate::dispatch::InvocationContext;
use crate::error::HostError;
use crate::state::ModuleStorage;

/// Errors a module returns to the host.
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    /// The module rejected the request with a reason and payload. The host
    /// propagates both unchanged.
    #[error("reverted: {reason}")]
    Revert {
        /// Human-readable reason.
        reason: String,
        /// Structured failure data.
        data: Payload,
    },

    /// The module failed without any payload.
    #[error("module failed without a reason")]
    Opaque,

    /// A nested host call failed and the module passed the error through.
    #[error(transparent)]
    Host(Box<HostError>),
}

impl ModuleError {
    /// A revert with a reason and no data.
    #[must_use]
    pub fn revert(reason: impl Into<String>) -> Self {
        Self::Revert {
            reason: reason.into(),
            data: Payload::Null,
        }
    }

    /// A revert with a reason and structured data.
    #[must_use]
    pub fn revert_with(reason: impl Into<String>, data: Payload) -> Self {
        Self::Revert {
            reason: reason.into(),
            data,
        }
    }
}

impl From<HostError> for ModuleError {
    fn from(err: HostError) -> Self {
        Self::Host(Box::new(err))
    }
}

/// Result type for module code.
pub type ModuleResult<T> = Result<T, ModuleError>;

/// A pluggable unit of code installed into a host.
///
/// Implementations are stateless from the host's point of view: everything a
/// module needs to remember goes into the slot storage handed to it by the
/// host, which is what lets an implementation be swapped without losing
/// state.
pub trait Module: Send + Sync {
    /// Stable identity of this implementation.
    fn id(&self) -> &ModuleId;

    /// The module's declarations. Read at install, uninstall and update.
    fn manifest(&self) -> ModuleManifest;

    /// Install hook. Only called if the manifest asks for lifecycle
    /// callbacks.
    ///
    /// # Errors
    ///
    /// Any error aborts the install.
    fn on_install(
        &self,
        ctx: &mut LifecycleContext<'_>,
        installer: &Caller,
        init_data: &Payload,
    ) -> ModuleResult<()> {
        let _ = (ctx, installer, init_data);
        Ok(())
    }

    /// Uninstall hook. Only called if the manifest snapshot taken at
    /// install asked for lifecycle callbacks.
    ///
    /// # Errors
    ///
    /// Any error aborts the uninstall.
    fn on_uninstall(
        &self,
        ctx: &mut LifecycleContext<'_>,
        installer: &Caller,
        data: &Payload,
    ) -> ModuleResult<()> {
        let _ = (ctx, installer, data);
        Ok(())
    }

    /// Execute a callback or fallback operation routed to this module.
    ///
    /// # Errors
    ///
    /// Module failures are surfaced to the caller as host errors.
    fn invoke(
        &self,
        operation: &OperationId,
        args: Payload,
        ctx: &mut InvocationContext<'_>,
    ) -> ModuleResult<Payload>;
}

/// What a lifecycle hook can see and touch.
#[derive(Debug)]
pub struct LifecycleContext<'a> {
    module: &'a ModuleId,
    slot: SlotId,
    storage: &'a mut ModuleStorage,
}

impl<'a> LifecycleContext<'a> {
    pub(crate) fn new(module: &'a ModuleId, slot: SlotId, storage: &'a mut ModuleStorage) -> Self {
        Self {
            module,
            slot,
            storage,
        }
    }

    /// The module being installed or uninstalled.
    #[must_use]
    pub fn module_id(&self) -> &ModuleId {
        self.module
    }

    /// The module's slot.
    #[must_use]
    pub fn slot(&self) -> SlotId {
        self.slot
    }

    /// The slot's storage.
    #[must_use]
    pub fn storage(&self) -> &ModuleStorage {
        self.storage
    }

    /// Mutable access to the slot's storage.
    pub fn storage_mut(&mut self) -> &mut ModuleStorage {
        self.storage
    }
}
