//! modhost Core - Foundation types for the modhost pluggable module host.
//!
//! This crate provides:
//! - Validated identifiers for modules, capabilities, operations, permissions
//!   and callers
//! - The module capability manifest
//! - Host callback catalogs and the `HostDefinition` trait
//! - The `Caller` model distinguishing the host from external principals

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod caller;
pub mod catalog;
pub mod error;
pub mod ids;
pub mod manifest;

pub use caller::Caller;
pub use catalog::{
    CallbackCatalog, CallbackRequirement, CatalogEntry, HostDefinition, StaticHostDefinition,
};
pub use error::{IdError, IdResult};
pub use ids::{CapabilityId, ModuleId, OperationId, Permission, PrincipalId, SlotId};
pub use manifest::{CallbackDeclaration, FallbackDeclaration, InvocationMode, ModuleManifest};

/// Arguments, results and lifecycle data exchanged with modules.
pub type Payload = serde_json::Value;
