//! The module host.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, debug_span};
use uuid::Uuid;

use modhost_core::{
    CallbackCatalog, Caller, CapabilityId, HostDefinition, ModuleId, OperationId, Payload, SlotId,
};
use modhost_events::{EventBus, EventMetadata, EventReceiver, HostEvent};

use crate::access::{AccessControl, DenyAll};
use crate::callback::CallbackOutcome;
use crate::capability::CapabilityTracker;
use crate::dispatch::{CallStack, Router};
use crate::error::HostResult;
use crate::operations::{OperationEntry, OperationTable};
use crate::registry::{InstalledModule, ModuleRegistry};
use crate::settings::HostSettings;
use crate::slots::SlotTable;
use crate::state::{ModuleStorage, StateStore};

/// Structural tables. Only the installer mutates them.
#[derive(Debug)]
pub(crate) struct HostCore {
    pub(crate) catalog: CallbackCatalog,
    pub(crate) registry: ModuleRegistry,
    pub(crate) capabilities: CapabilityTracker,
    pub(crate) operations: OperationTable,
    pub(crate) slots: SlotTable,
}

/// A host that modules can be installed into.
///
/// The host owns every table and all module state. Structural changes
/// ([`install_module`](Self::install_module),
/// [`uninstall_module`](Self::uninstall_module),
/// [`update_module`](Self::update_module)) and request handling
/// ([`dispatch`](Self::dispatch), [`execute_callback`](Self::execute_callback))
/// each run to completion and are all-or-nothing.
pub struct ModuleHost {
    host_id: Uuid,
    definition_name: String,
    settings: HostSettings,
    pub(crate) core: HostCore,
    pub(crate) state: StateStore,
    pub(crate) access: Arc<dyn AccessControl>,
    events: EventBus,
}

impl fmt::Debug for ModuleHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleHost")
            .field("host_id", &self.host_id)
            .field("definition_name", &self.definition_name)
            .field("settings", &self.settings)
            .field("installed", &self.core.registry.len())
            .field("slots", &self.core.slots.len())
            .field("operations", &self.core.operations.len())
            .finish_non_exhaustive()
    }
}

impl ModuleHost {
    /// Create a host of the given type.
    ///
    /// The callback catalog is read from `definition` once, here. The host
    /// starts with default settings and [`DenyAll`] access control, so only
    /// [`Caller::Host`] can install modules until an oracle is supplied.
    #[must_use]
    pub fn new(definition: &dyn HostDefinition) -> Self {
        let host_id = Uuid::new_v4();
        let settings = HostSettings::default();
        let events = EventBus::with_capacity(settings.event_capacity);
        debug!(
            host_id = %host_id,
            definition = definition.name(),
            "Created module host"
        );
        Self {
            host_id,
            definition_name: definition.name().to_string(),
            core: HostCore {
                catalog: definition.callback_catalog(),
                registry: ModuleRegistry::new(),
                capabilities: CapabilityTracker::new(),
                operations: OperationTable::new(),
                slots: SlotTable::new(host_id),
            },
            state: StateStore::new(),
            access: Arc::new(DenyAll),
            events,
            settings,
        }
    }

    /// Replace the settings. Recreates the event channel, so call this
    /// before subscribing.
    #[must_use]
    pub fn with_settings(mut self, settings: HostSettings) -> Self {
        self.events = EventBus::with_capacity(settings.event_capacity);
        self.settings = settings;
        self
    }

    /// Use `access` for installer and fallback permission checks.
    #[must_use]
    pub fn with_access_control(mut self, access: Arc<dyn AccessControl>) -> Self {
        self.access = access;
        self
    }

    pub(crate) fn publish(&self, event: HostEvent) {
        self.events.publish(event);
    }

    pub(crate) fn event_metadata(&self) -> EventMetadata {
        EventMetadata::new(self.host_id, self.definition_name.clone())
    }

    // -----------------------------------------------------------------
    // Request handling
    // -----------------------------------------------------------------

    /// Route an operation the host does not implement natively.
    ///
    /// # Errors
    ///
    /// - [`HostError::OperationNotInstalled`](crate::HostError::OperationNotInstalled)
    ///   if no module handles `operation`
    /// - [`UnauthorizedCallbackInvocation`](crate::HostError::UnauthorizedCallbackInvocation)
    ///   if `operation` is a callback and `caller` is not the host
    /// - [`HostError::Unauthorized`](crate::HostError::Unauthorized) if the
    ///   fallback's permission is not held
    /// - any failure of the module itself
    pub fn dispatch(
        &mut self,
        caller: &Caller,
        operation: &OperationId,
        args: Payload,
    ) -> HostResult<Payload> {
        let span = debug_span!("dispatch", operation = %operation, caller = %caller);
        let _guard = span.enter();

        let router = Router {
            core: &self.core,
            access: self.access.as_ref(),
            max_depth: self.settings.max_call_depth,
        };
        router.dispatch(
            &mut self.state,
            &mut CallStack::default(),
            caller,
            operation,
            args,
            false,
        )
    }

    /// Run a catalog callback from host logic.
    ///
    /// Returns [`CallbackOutcome::Skipped`] when the callback is optional and
    /// unimplemented.
    ///
    /// # Errors
    ///
    /// - [`HostError::UnsupportedCallback`](crate::HostError::UnsupportedCallback)
    ///   if `operation` is not in the catalog
    /// - [`HostError::CallbackRequired`](crate::HostError::CallbackRequired)
    ///   if it is required and unimplemented
    /// - any failure of the module itself
    pub fn execute_callback(
        &mut self,
        operation: &OperationId,
        args: Payload,
    ) -> HostResult<CallbackOutcome> {
        self.run_callback(operation, args, false)
    }

    /// Like [`execute_callback`](Self::execute_callback), but every state
    /// write by the module (or anything it calls) fails with
    /// [`HostError::ReadOnlyViolation`](crate::HostError::ReadOnlyViolation).
    ///
    /// # Errors
    ///
    /// Same as [`execute_callback`](Self::execute_callback).
    pub fn execute_callback_read_only(
        &mut self,
        operation: &OperationId,
        args: Payload,
    ) -> HostResult<CallbackOutcome> {
        self.run_callback(operation, args, true)
    }

    fn run_callback(
        &mut self,
        operation: &OperationId,
        args: Payload,
        read_only: bool,
    ) -> HostResult<CallbackOutcome> {
        let span = debug_span!("execute_callback", operation = %operation, read_only);
        let _guard = span.enter();

        let router = Router {
            core: &self.core,
            access: self.access.as_ref(),
            max_depth: self.settings.max_call_depth,
        };
        router.execute_callback(
            &mut self.state,
            &mut CallStack::default(),
            operation,
            args,
            read_only,
        )
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    /// Installed modules, sorted by id.
    #[must_use]
    pub fn installed_modules(&self) -> Vec<&InstalledModule> {
        self.core.registry.iter().collect()
    }

    /// One installed module.
    #[must_use]
    pub fn installed_module(&self, id: &ModuleId) -> Option<&InstalledModule> {
        self.core.registry.get(id)
    }

    /// Whether a module is installed.
    #[must_use]
    pub fn is_installed(&self, id: &ModuleId) -> bool {
        self.core.registry.contains(id)
    }

    /// Whether some installed module provides `capability`.
    #[must_use]
    pub fn is_capability_supported(&self, capability: &CapabilityId) -> bool {
        self.core.capabilities.is_supported(capability)
    }

    /// The capability refcounts.
    #[must_use]
    pub fn capabilities(&self) -> &CapabilityTracker {
        &self.core.capabilities
    }

    /// The handler of one operation.
    #[must_use]
    pub fn operation(&self, operation: &OperationId) -> Option<&OperationEntry> {
        self.core.operations.get(operation)
    }

    /// The full operation table.
    #[must_use]
    pub fn operations(&self) -> &OperationTable {
        &self.core.operations
    }

    /// The installed module set.
    #[must_use]
    pub fn registry(&self) -> &ModuleRegistry {
        &self.core.registry
    }

    /// The host's fixed callback catalog.
    #[must_use]
    pub fn catalog(&self) -> &CallbackCatalog {
        &self.core.catalog
    }

    /// This host instance's id, carried in every event.
    #[must_use]
    pub fn host_id(&self) -> Uuid {
        self.host_id
    }

    /// The host type name from its definition.
    #[must_use]
    pub fn definition_name(&self) -> &str {
        &self.definition_name
    }

    /// Current settings.
    #[must_use]
    pub fn settings(&self) -> &HostSettings {
        &self.settings
    }

    /// The slot bound to an installed module.
    #[must_use]
    pub fn slot_of(&self, id: &ModuleId) -> Option<SlotId> {
        self.core.registry.get(id).map(|m| m.slot)
    }

    /// Host-scoped key of a slot, stable for the host's lifetime.
    #[must_use]
    pub fn slot_key(&self, slot: SlotId) -> Option<Uuid> {
        self.core.slots.key(slot)
    }

    /// Storage of a slot. Available for released slots too.
    #[must_use]
    pub fn slot_storage(&self, slot: SlotId) -> Option<&ModuleStorage> {
        self.state.get(slot)
    }

    /// All module state.
    #[must_use]
    pub fn state(&self) -> &StateStore {
        &self.state
    }

    /// The host's event bus.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Subscribe to structural change events.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }
}
