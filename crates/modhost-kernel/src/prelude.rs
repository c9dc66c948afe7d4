//! Prelude module - commonly used types for convenient import.
//!
//! Use `use modhost_kernel::prelude::*;` to import all essential types.

// Host
pub use crate::{HostSettings, ModuleHost};

// Errors
pub use crate::{HostError, HostResult, ModuleError, ModuleResult};

// Modules
pub use crate::{InvocationContext, LifecycleContext, Module};

// Access control
pub use crate::{AccessControl, DenyAll, RoleGrants};

// Results and bookkeeping
pub use crate::{CallbackOutcome, InstalledModule, ModuleStorage, OperationEntry, OperationKind};
