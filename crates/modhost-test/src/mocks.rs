//! Mock modules for testing.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use modhost_core::{Caller, ModuleId, ModuleManifest, OperationId, Payload};
use modhost_kernel::{InvocationContext, LifecycleContext, Module, ModuleError, ModuleResult};

/// Handler run when a [`ScriptedModule`] receives an operation.
pub type Handler =
    Arc<dyn Fn(Payload, &mut InvocationContext<'_>) -> ModuleResult<Payload> + Send + Sync>;

/// A call observed by a [`ScriptedModule`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// The operation that was routed to the module.
    pub operation: OperationId,
    /// The arguments it received.
    pub args: Payload,
    /// Whether the context was read-only.
    pub read_only: bool,
    /// Nesting depth at the time of the call.
    pub depth: u32,
}

/// A lifecycle hook observed by a [`ScriptedModule`].
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleRecord {
    /// `on_install` ran.
    Installed {
        /// Who installed the module.
        installer: Caller,
        /// The init data passed in.
        data: Payload,
    },
    /// `on_uninstall` ran.
    Uninstalled {
        /// Who uninstalled the module.
        installer: Caller,
        /// The data passed in.
        data: Payload,
    },
}

/// A module whose behavior is scripted per operation.
///
/// Operations without a handler echo their arguments. The lifecycle hooks
/// store their data under the `init` and `farewell` keys before applying any
/// scripted failure, so tests can check that those writes are rolled back.
///
/// Clones share their manifest and recordings, so a test can keep a handle
/// after passing the module to the host.
#[derive(Clone)]
pub struct ScriptedModule {
    id: ModuleId,
    manifest: Arc<Mutex<ModuleManifest>>,
    handlers: HashMap<OperationId, Handler>,
    install_failure: Option<String>,
    uninstall_failure: Option<String>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    lifecycle: Arc<Mutex<Vec<LifecycleRecord>>>,
}

impl fmt::Debug for ScriptedModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedModule")
            .field("id", &self.id)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("install_failure", &self.install_failure)
            .field("uninstall_failure", &self.uninstall_failure)
            .finish_non_exhaustive()
    }
}

impl ScriptedModule {
    /// Create a module with an empty manifest.
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self {
            id: ModuleId::from_static(id),
            manifest: Arc::new(Mutex::new(ModuleManifest::new())),
            handlers: HashMap::new(),
            install_failure: None,
            uninstall_failure: None,
            calls: Arc::new(Mutex::new(Vec::new())),
            lifecycle: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set the manifest.
    #[must_use]
    pub fn with_manifest(self, manifest: ModuleManifest) -> Self {
        self.set_manifest(manifest);
        self
    }

    /// Script the handler of one operation.
    #[must_use]
    pub fn on<F>(mut self, operation: &str, handler: F) -> Self
    where
        F: Fn(Payload, &mut InvocationContext<'_>) -> ModuleResult<Payload> + Send + Sync + 'static,
    {
        self.handlers
            .insert(OperationId::from_static(operation), Arc::new(handler));
        self
    }

    /// Make `operation` revert with `reason`.
    #[must_use]
    pub fn reverting(self, operation: &str, reason: &str) -> Self {
        let reason = reason.to_string();
        self.on(operation, move |args, _| {
            Err(ModuleError::revert_with(reason.clone(), args))
        })
    }

    /// Make `on_install` fail with `reason`.
    #[must_use]
    pub fn failing_install(mut self, reason: &str) -> Self {
        self.install_failure = Some(reason.to_string());
        self
    }

    /// Make `on_uninstall` fail with `reason`.
    #[must_use]
    pub fn failing_uninstall(mut self, reason: &str) -> Self {
        self.uninstall_failure = Some(reason.to_string());
        self
    }

    /// Replace the manifest reported from now on. Shared with clones.
    pub fn set_manifest(&self, manifest: ModuleManifest) {
        if let Ok(mut guard) = self.manifest.lock() {
            *guard = manifest;
        }
    }

    /// Wrap into the shape the host installs.
    #[must_use]
    pub fn into_module(self) -> Arc<dyn Module> {
        Arc::new(self)
    }

    /// Calls routed to this module so far.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Number of calls routed to this module.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|g| g.len()).unwrap_or_default()
    }

    /// Lifecycle hooks run so far.
    #[must_use]
    pub fn lifecycle(&self) -> Vec<LifecycleRecord> {
        self.lifecycle.lock().map(|g| g.clone()).unwrap_or_default()
    }

    fn record_lifecycle(&self, record: LifecycleRecord) {
        if let Ok(mut guard) = self.lifecycle.lock() {
            guard.push(record);
        }
    }
}

impl Module for ScriptedModule {
    fn id(&self) -> &ModuleId {
        &self.id
    }

    fn manifest(&self) -> ModuleManifest {
        self.manifest.lock().map(|g| g.clone()).unwrap_or_default()
    }

    fn on_install(
        &self,
        ctx: &mut LifecycleContext<'_>,
        installer: &Caller,
        init_data: &Payload,
    ) -> ModuleResult<()> {
        ctx.storage_mut().set("init", init_data.clone());
        self.record_lifecycle(LifecycleRecord::Installed {
            installer: installer.clone(),
            data: init_data.clone(),
        });
        match &self.install_failure {
            Some(reason) => Err(ModuleError::revert(reason.clone())),
            None => Ok(()),
        }
    }

    fn on_uninstall(
        &self,
        ctx: &mut LifecycleContext<'_>,
        installer: &Caller,
        data: &Payload,
    ) -> ModuleResult<()> {
        ctx.storage_mut().set("farewell", data.clone());
        self.record_lifecycle(LifecycleRecord::Uninstalled {
            installer: installer.clone(),
            data: data.clone(),
        });
        match &self.uninstall_failure {
            Some(reason) => Err(ModuleError::revert(reason.clone())),
            None => Ok(()),
        }
    }

    fn invoke(
        &self,
        operation: &OperationId,
        args: Payload,
        ctx: &mut InvocationContext<'_>,
    ) -> ModuleResult<Payload> {
        if let Ok(mut guard) = self.calls.lock() {
            guard.push(RecordedCall {
                operation: operation.clone(),
                args: args.clone(),
                read_only: ctx.is_read_only(),
                depth: ctx.depth(),
            });
        }
        match self.handlers.get(operation) {
            Some(handler) => handler(args, ctx),
            None => Ok(args),
        }
    }
}
