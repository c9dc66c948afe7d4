//! Module capability manifests.
//!
//! A manifest is what a module tells the host about itself: which
//! capabilities it needs and offers, which host callbacks it implements, and
//! which external operations it wants routed to it. The host reads it at
//! install time and derives all of its bookkeeping from it.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::ids::{CapabilityId, OperationId, Permission};

/// How the host must run a callback implementation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationMode {
    /// The callback may mutate its slot's state.
    #[default]
    Mutating,
    /// The callback is always executed with state mutation rejected.
    ReadOnly,
}

/// A callback operation implemented by a module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallbackDeclaration {
    /// The host callback being implemented.
    pub operation: OperationId,
    /// How the host must run it.
    #[serde(default)]
    pub mode: InvocationMode,
}

/// An externally reachable operation forwarded to a module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FallbackDeclaration {
    /// The exposed operation.
    pub operation: OperationId,
    /// Permission a caller must hold, if any.
    #[serde(default)]
    pub permission: Option<Permission>,
}

/// Everything a module declares to the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleManifest {
    /// Capabilities that must already be supported before install.
    #[serde(default)]
    pub required_capabilities: BTreeSet<CapabilityId>,
    /// Capabilities this module contributes while installed.
    #[serde(default)]
    pub provided_capabilities: BTreeSet<CapabilityId>,
    /// Host callbacks implemented by this module.
    #[serde(default)]
    pub callbacks: Vec<CallbackDeclaration>,
    /// External operations routed to this module.
    #[serde(default)]
    pub fallbacks: Vec<FallbackDeclaration>,
    /// Whether `on_install` / `on_uninstall` should be invoked.
    #[serde(default)]
    pub wants_lifecycle_callback: bool,
}

impl ModuleManifest {
    /// Create an empty manifest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a capability.
    #[must_use]
    pub fn requires(mut self, capability: CapabilityId) -> Self {
        self.required_capabilities.insert(capability);
        self
    }

    /// Provide a capability.
    #[must_use]
    pub fn provides(mut self, capability: CapabilityId) -> Self {
        self.provided_capabilities.insert(capability);
        self
    }

    /// Implement a mutating callback.
    #[must_use]
    pub fn callback(self, operation: OperationId) -> Self {
        self.callback_with_mode(operation, InvocationMode::Mutating)
    }

    /// Implement a callback with an explicit invocation mode.
    #[must_use]
    pub fn callback_with_mode(mut self, operation: OperationId, mode: InvocationMode) -> Self {
        self.callbacks.push(CallbackDeclaration { operation, mode });
        self
    }

    /// Expose an operation open to every caller.
    #[must_use]
    pub fn fallback(mut self, operation: OperationId) -> Self {
        self.fallbacks.push(FallbackDeclaration {
            operation,
            permission: None,
        });
        self
    }

    /// Expose an operation gated on a permission.
    #[must_use]
    pub fn restricted_fallback(mut self, operation: OperationId, permission: Permission) -> Self {
        self.fallbacks.push(FallbackDeclaration {
            operation,
            permission: Some(permission),
        });
        self
    }

    /// Ask for lifecycle callbacks.
    #[must_use]
    pub fn with_lifecycle_callback(mut self) -> Self {
        self.wants_lifecycle_callback = true;
        self
    }

    /// All operation ids this manifest claims, callbacks first.
    pub fn operations(&self) -> impl Iterator<Item = &OperationId> {
        self.callbacks
            .iter()
            .map(|c| &c.operation)
            .chain(self.fallbacks.iter().map(|f| &f.operation))
    }
}
