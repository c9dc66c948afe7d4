//! Installation, uninstallation and upgrade of modules.
//!
//! Every structural change runs against an undo [`Journal`]. A failure at
//! any step replays the journal, so callers only ever observe the state
//! before the call or the state after it.

use std::sync::Arc;

use tracing::{debug, info, info_span, warn};

use modhost_core::{Caller, InvocationMode, ModuleId, ModuleManifest, Payload, SlotId};
use modhost_events::HostEvent;

use crate::access::caller_has;
use crate::error::{HostError, HostResult};
use crate::host::{HostCore, ModuleHost};
use crate::journal::{Journal, Undo};
use crate::module::{LifecycleContext, Module};
use crate::operations::{OperationEntry, OperationKind};
use crate::registry::InstalledModule;
use crate::slots::Binding;
use crate::state::StateStore;

impl ModuleHost {
    /// Install a module and register everything its manifest declares.
    ///
    /// Returns the slot allocated to the module.
    ///
    /// # Errors
    ///
    /// - [`HostError::Unauthorized`] if `caller` lacks the installer permission
    /// - [`HostError::DuplicateModule`] if the id is already installed
    /// - [`HostError::CapabilityMismatch`] if a required capability is missing
    /// - [`HostError::UnsupportedCallback`] for callbacks outside the catalog
    /// - [`HostError::CallbackConflict`] / [`HostError::FallbackConflict`]
    ///   if an operation is already claimed
    /// - [`HostError::LifecycleCallbackFailed`] if `on_install` fails
    ///
    /// On error nothing has changed.
    pub fn install_module(
        &mut self,
        caller: &Caller,
        module: Arc<dyn Module>,
        init_data: Payload,
    ) -> HostResult<SlotId> {
        let id = module.id().clone();
        let span = info_span!("install_module", module_id = %id, caller = %caller);
        let _guard = span.enter();

        self.authorize_installer(caller)?;
        if self.core.registry.contains(&id) {
            warn!(module_id = %id, "Module already installed");
            return Err(HostError::DuplicateModule { module: id });
        }

        let manifest = module.manifest();
        let mut journal = Journal::new();
        let result = apply_install(
            &mut self.core,
            &mut self.state,
            &mut journal,
            caller,
            &id,
            module,
            manifest,
            &init_data,
        );

        match result {
            Ok(slot) => {
                info!(module_id = %id, slot = %slot, "Installed module");
                self.publish(HostEvent::ModuleInstalled {
                    metadata: self.event_metadata(),
                    module: id,
                    slot,
                });
                Ok(slot)
            },
            Err(e) => {
                warn!(module_id = %id, error = %e, "Install failed");
                journal.rollback(&mut self.core, &mut self.state);
                Err(e)
            },
        }
    }

    /// Uninstall a module, withdrawing everything it registered.
    ///
    /// The slot's storage is kept; only the slot-to-module mapping is
    /// released.
    ///
    /// # Errors
    ///
    /// - [`HostError::Unauthorized`] if `caller` lacks the installer permission
    /// - [`HostError::NotInstalled`] if no such module is installed
    /// - [`HostError::LifecycleCallbackFailed`] if `on_uninstall` fails
    ///
    /// On error nothing has changed.
    pub fn uninstall_module(
        &mut self,
        caller: &Caller,
        id: &ModuleId,
        data: Payload,
    ) -> HostResult<()> {
        let span = info_span!("uninstall_module", module_id = %id, caller = %caller);
        let _guard = span.enter();

        self.authorize_installer(caller)?;
        let (installed, binding) = self.installed_binding(id)?;

        let current = binding.implementation.manifest();
        if current != installed.manifest {
            warn!(
                module_id = %id,
                "Manifest changed since install, using install-time snapshot"
            );
        }

        let slot = installed.slot;
        let mut journal = Journal::new();
        let result = apply_uninstall(
            &mut self.core,
            &mut self.state,
            &mut journal,
            caller,
            installed,
            &binding,
            &data,
        );

        match result {
            Ok(()) => {
                info!(module_id = %id, slot = %slot, "Uninstalled module");
                self.publish(HostEvent::ModuleUninstalled {
                    metadata: self.event_metadata(),
                    module: id.clone(),
                    slot,
                });
                Ok(())
            },
            Err(e) => {
                warn!(module_id = %id, error = %e, "Uninstall failed");
                journal.rollback(&mut self.core, &mut self.state);
                Err(e)
            },
        }
    }

    /// Swap the implementation behind an installed module's slot.
    ///
    /// Bookkeeping of the old manifest snapshot is withdrawn and the new
    /// manifest is registered with the same checks as an install. The
    /// slot, and with it all stored state, is kept. Lifecycle hooks are not
    /// invoked.
    ///
    /// # Errors
    ///
    /// - [`HostError::Unauthorized`] if `caller` lacks the installer permission
    /// - [`HostError::NotInstalled`] if `old_id` is not installed
    /// - [`HostError::DuplicateModule`] if the new id belongs to another
    ///   installed module
    /// - any registration error of [`install_module`](Self::install_module)
    ///
    /// On error nothing has changed.
    pub fn update_module(
        &mut self,
        caller: &Caller,
        old_id: &ModuleId,
        new: Arc<dyn Module>,
    ) -> HostResult<SlotId> {
        let new_id = new.id().clone();
        let span = info_span!(
            "update_module",
            module_id = %old_id,
            new_module_id = %new_id,
            caller = %caller
        );
        let _guard = span.enter();

        self.authorize_installer(caller)?;
        let (installed, _) = self.installed_binding(old_id)?;
        if new_id != *old_id && self.core.registry.contains(&new_id) {
            warn!(module_id = %new_id, "Replacement module already installed");
            return Err(HostError::DuplicateModule { module: new_id });
        }

        let manifest = new.manifest();
        let slot = installed.slot;
        let mut journal = Journal::new();
        let result = apply_update(&mut self.core, &mut journal, installed, &new_id, new, manifest);

        match result {
            Ok(()) => {
                info!(
                    module_id = %new_id,
                    previous = %old_id,
                    slot = %slot,
                    "Updated module"
                );
                self.publish(HostEvent::ModuleUpdated {
                    metadata: self.event_metadata(),
                    previous: old_id.clone(),
                    module: new_id,
                    slot,
                });
                Ok(slot)
            },
            Err(e) => {
                warn!(module_id = %old_id, error = %e, "Update failed");
                journal.rollback(&mut self.core, &mut self.state);
                Err(e)
            },
        }
    }

    fn authorize_installer(&self, caller: &Caller) -> HostResult<()> {
        let permission = &self.settings().installer_permission;
        if caller_has(self.access.as_ref(), caller, permission) {
            return Ok(());
        }
        warn!(caller = %caller, permission = %permission, "Rejected installer call");
        Err(HostError::Unauthorized {
            caller: caller.clone(),
            permission: permission.clone(),
        })
    }

    fn installed_binding(&self, id: &ModuleId) -> HostResult<(InstalledModule, Binding)> {
        let not_installed = || HostError::NotInstalled { module: id.clone() };
        let installed = self.core.registry.get(id).cloned().ok_or_else(not_installed)?;
        let binding = self
            .core
            .slots
            .binding(installed.slot)
            .cloned()
            .ok_or_else(not_installed)?;
        Ok((installed, binding))
    }
}

#[allow(clippy::too_many_arguments)]
fn apply_install(
    core: &mut HostCore,
    state: &mut StateStore,
    journal: &mut Journal,
    caller: &Caller,
    id: &ModuleId,
    module: Arc<dyn Module>,
    manifest: ModuleManifest,
    init_data: &Payload,
) -> HostResult<SlotId> {
    let slot = core.slots.allocate(Binding {
        module: id.clone(),
        implementation: Arc::clone(&module),
    })?;
    journal.record(Undo::SlotAllocated(slot));
    debug!(module_id = %id, slot = %slot, "Allocated slot");

    register_manifest(core, journal, id, slot, &manifest)?;

    if manifest.wants_lifecycle_callback {
        let mut ctx = LifecycleContext::new(id, slot, state.create(slot));
        module
            .on_install(&mut ctx, caller, init_data)
            .map_err(|source| HostError::LifecycleCallbackFailed {
                module: id.clone(),
                source,
            })?;
    }

    if !core.registry.insert(InstalledModule {
        id: id.clone(),
        slot,
        manifest,
    }) {
        return Err(HostError::DuplicateModule { module: id.clone() });
    }
    journal.record(Undo::ModuleAdded(id.clone()));
    Ok(slot)
}

fn apply_uninstall(
    core: &mut HostCore,
    state: &mut StateStore,
    journal: &mut Journal,
    caller: &Caller,
    installed: InstalledModule,
    binding: &Binding,
    data: &Payload,
) -> HostResult<()> {
    let slot = installed.slot;
    unregister_manifest(core, journal, slot, &installed.manifest);

    if installed.manifest.wants_lifecycle_callback {
        journal.record(Undo::StorageReplaced(slot, state.get(slot).cloned()));
        let mut ctx = LifecycleContext::new(&installed.id, slot, state.create(slot));
        binding
            .implementation
            .on_uninstall(&mut ctx, caller, data)
            .map_err(|source| HostError::LifecycleCallbackFailed {
                module: installed.id.clone(),
                source,
            })?;
    }

    let previous = core.slots.rebind(slot, None);
    journal.record(Undo::SlotRebound(slot, previous));

    if let Some(removed) = core.registry.remove(&installed.id) {
        journal.record(Undo::ModuleRemoved(removed));
    }
    Ok(())
}

fn apply_update(
    core: &mut HostCore,
    journal: &mut Journal,
    installed: InstalledModule,
    new_id: &ModuleId,
    new: Arc<dyn Module>,
    manifest: ModuleManifest,
) -> HostResult<()> {
    let slot = installed.slot;
    unregister_manifest(core, journal, slot, &installed.manifest);

    let previous = core.slots.rebind(
        slot,
        Some(Binding {
            module: new_id.clone(),
            implementation: new,
        }),
    );
    journal.record(Undo::SlotRebound(slot, previous));

    if let Some(removed) = core.registry.remove(&installed.id) {
        journal.record(Undo::ModuleRemoved(removed));
    }

    register_manifest(core, journal, new_id, slot, &manifest)?;

    if !core.registry.insert(InstalledModule {
        id: new_id.clone(),
        slot,
        manifest,
    }) {
        return Err(HostError::DuplicateModule {
            module: new_id.clone(),
        });
    }
    journal.record(Undo::ModuleAdded(new_id.clone()));
    Ok(())
}

/// Check and register a manifest's capabilities and operations against
/// `slot`.
fn register_manifest(
    core: &mut HostCore,
    journal: &mut Journal,
    id: &ModuleId,
    slot: SlotId,
    manifest: &ModuleManifest,
) -> HostResult<()> {
    // Required capabilities are checked before this module's own
    // contributions are counted.
    if let Some(missing) = manifest
        .required_capabilities
        .iter()
        .find(|c| !core.capabilities.is_supported(c))
    {
        warn!(module_id = %id, capability = %missing, "Required capability not supported");
        return Err(HostError::CapabilityMismatch {
            module: id.clone(),
            capability: missing.clone(),
        });
    }

    for capability in &manifest.provided_capabilities {
        let count = core.capabilities.increment(capability);
        journal.record(Undo::CapabilityIncremented(capability.clone()));
        debug!(module_id = %id, capability = %capability, count, "Provided capability");
    }

    for callback in &manifest.callbacks {
        if !core.catalog.contains(&callback.operation) {
            warn!(module_id = %id, operation = %callback.operation, "Callback not in host catalog");
            return Err(HostError::UnsupportedCallback {
                operation: callback.operation.clone(),
            });
        }
        core.operations.register(
            callback.operation.clone(),
            OperationEntry {
                slot,
                module: id.clone(),
                kind: OperationKind::Callback,
                permission: None,
                mode: callback.mode,
            },
        )?;
        journal.record(Undo::OperationRegistered(callback.operation.clone()));
    }

    for fallback in &manifest.fallbacks {
        core.operations.register(
            fallback.operation.clone(),
            OperationEntry {
                slot,
                module: id.clone(),
                kind: OperationKind::Fallback,
                permission: fallback.permission.clone(),
                mode: InvocationMode::Mutating,
            },
        )?;
        journal.record(Undo::OperationRegistered(fallback.operation.clone()));
    }

    Ok(())
}

/// Withdraw a manifest snapshot's operations and capability contributions.
///
/// Only entries still pointing at `slot` are removed.
fn unregister_manifest(
    core: &mut HostCore,
    journal: &mut Journal,
    slot: SlotId,
    manifest: &ModuleManifest,
) {
    for operation in manifest.operations() {
        if core.operations.get(operation).is_some_and(|e| e.slot == slot) {
            if let Some(entry) = core.operations.unregister(operation) {
                journal.record(Undo::OperationUnregistered(operation.clone(), entry));
            }
        } else {
            warn!(slot = %slot, operation = %operation, "Operation not registered to slot");
        }
    }

    for capability in &manifest.provided_capabilities {
        if core.capabilities.decrement(capability) {
            journal.record(Undo::CapabilityDecremented(capability.clone()));
        }
    }
}
