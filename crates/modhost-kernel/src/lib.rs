//! modhost Kernel - The module host.
//!
//! A [`ModuleHost`] lets independently authored [`Module`]s extend a fixed
//! host at runtime. Each module declares, through its manifest, the host
//! callbacks it implements and the external (fallback) operations it wants
//! routed to it. The kernel provides:
//!
//! - **Installation**: atomic install, uninstall and update with capability
//!   checks and conflict-free operation registration
//! - **Dispatch**: permission-gated routing of fallback operations and
//!   host-only callback operations, with re-entrant calls from module code
//! - **Slots**: stable identities that let an implementation be swapped
//!   while its host-owned state survives
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use modhost_core::prelude::*;
//! use modhost_kernel::{InvocationContext, Module, ModuleHost, ModuleResult};
//! use serde_json::json;
//!
//! struct Counter(ModuleId);
//!
//! impl Module for Counter {
//!     fn id(&self) -> &ModuleId {
//!         &self.0
//!     }
//!
//!     fn manifest(&self) -> ModuleManifest {
//!         ModuleManifest::new().fallback(OperationId::from_static("increment"))
//!     }
//!
//!     fn invoke(
//!         &self,
//!         _operation: &OperationId,
//!         _args: Payload,
//!         ctx: &mut InvocationContext<'_>,
//!     ) -> ModuleResult<Payload> {
//!         let next = ctx.get("count").and_then(Payload::as_u64).unwrap_or(0).saturating_add(1);
//!         ctx.set("count", json!(next))?;
//!         Ok(json!(next))
//!     }
//! }
//!
//! let definition = StaticHostDefinition::new("counter-host", CallbackCatalog::new());
//! let mut host = ModuleHost::new(&definition);
//! host.install_module(
//!     &Caller::Host,
//!     Arc::new(Counter(ModuleId::from_static("counter"))),
//!     Payload::Null,
//! )
//! .unwrap();
//!
//! let alice = Caller::principal(PrincipalId::from_static("alice"));
//! let result = host
//!     .dispatch(&alice, &OperationId::from_static("increment"), Payload::Null)
//!     .unwrap();
//! assert_eq!(result, json!(1));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![allow(clippy::module_name_repetitions)]

pub mod prelude;

mod access;
mod callback;
mod capability;
mod dispatch;
mod error;
mod host;
mod installer;
mod journal;
mod module;
mod operations;
mod registry;
mod settings;
mod slots;
mod state;

pub use access::{AccessControl, DenyAll, RoleGrants};
pub use callback::CallbackOutcome;
pub use capability::CapabilityTracker;
pub use dispatch::InvocationContext;
pub use error::{HostError, HostResult};
pub use host::ModuleHost;
pub use module::{LifecycleContext, Module, ModuleError, ModuleResult};
pub use operations::{OperationEntry, OperationKind, OperationTable};
pub use registry::{InstalledModule, ModuleRegistry};
pub use settings::{DEFAULT_MAX_CALL_DEPTH, HostSettings};
pub use slots::slot_key;
pub use state::{ModuleStorage, StateStore};
