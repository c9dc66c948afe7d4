//! Prelude module - commonly used types for convenient import.
//!
//! Use `use modhost_core::prelude::*;` to import all essential types.

// Errors
pub use crate::{IdError, IdResult};

// Identifiers
pub use crate::{CapabilityId, ModuleId, OperationId, Permission, PrincipalId, SlotId};

// Callers
pub use crate::Caller;

// Manifests
pub use crate::{CallbackDeclaration, FallbackDeclaration, InvocationMode, ModuleManifest};

// Host type declaration
pub use crate::{
    CallbackCatalog, CallbackRequirement, CatalogEntry, HostDefinition, StaticHostDefinition,
};

// Data
pub use crate::Payload;
