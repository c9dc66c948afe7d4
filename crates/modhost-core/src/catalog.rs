//! Host callback catalogs and host type declarations.
//!
//! A host type decides, once and for all, at which points of its own logic
//! it calls out to modules. That list is the [`CallbackCatalog`]; it is
//! fixed when the host is constructed and never changes afterwards.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::OperationId;

/// Whether a host callback must have an implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackRequirement {
    /// Executing the callback with no module installed is an error.
    Required,
    /// Executing the callback with no module installed is a no-op.
    Optional,
}

/// One entry of a host's callback catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Required or optional.
    pub requirement: CallbackRequirement,
    /// Reject invocations while the same callback is already in flight.
    #[serde(default)]
    pub non_reentrant: bool,
}

impl CatalogEntry {
    /// A required callback.
    #[must_use]
    pub const fn required() -> Self {
        Self {
            requirement: CallbackRequirement::Required,
            non_reentrant: false,
        }
    }

    /// An optional callback.
    #[must_use]
    pub const fn optional() -> Self {
        Self {
            requirement: CallbackRequirement::Optional,
            non_reentrant: false,
        }
    }

    /// Guard the callback against recursive invocation.
    #[must_use]
    pub const fn non_reentrant(mut self) -> Self {
        self.non_reentrant = true;
        self
    }

    /// Whether an implementation must be installed.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.requirement == CallbackRequirement::Required
    }
}

/// The immutable set of callbacks a host type supports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackCatalog {
    entries: BTreeMap<OperationId, CatalogEntry>,
}

impl CallbackCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required callback.
    #[must_use]
    pub fn required(self, operation: OperationId) -> Self {
        self.with_entry(operation, CatalogEntry::required())
    }

    /// Add an optional callback.
    #[must_use]
    pub fn optional(self, operation: OperationId) -> Self {
        self.with_entry(operation, CatalogEntry::optional())
    }

    /// Add a callback with an explicit entry. A later entry for the same
    /// operation replaces the earlier one.
    #[must_use]
    pub fn with_entry(mut self, operation: OperationId, entry: CatalogEntry) -> Self {
        self.entries.insert(operation, entry);
        self
    }

    /// Look up a callback.
    #[must_use]
    pub fn get(&self, operation: &OperationId) -> Option<&CatalogEntry> {
        self.entries.get(operation)
    }

    /// Whether the host supports this callback at all.
    #[must_use]
    pub fn contains(&self, operation: &OperationId) -> bool {
        self.entries.contains_key(operation)
    }

    /// Iterate over catalog entries in operation order.
    pub fn iter(&self) -> impl Iterator<Item = (&OperationId, &CatalogEntry)> {
        self.entries.iter()
    }

    /// Number of callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Static declaration of a concrete host type.
///
/// Implementations describe the host's fixed extension points. The host
/// reads the catalog once at construction.
pub trait HostDefinition: Send + Sync {
    /// Human-readable host type name, used in logs and events.
    fn name(&self) -> &str;

    /// The callbacks this host type invokes.
    fn callback_catalog(&self) -> CallbackCatalog;
}

/// A host definition assembled at runtime from a name and a catalog.
#[derive(Debug, Clone)]
pub struct StaticHostDefinition {
    name: String,
    catalog: CallbackCatalog,
}

impl StaticHostDefinition {
    /// Create a definition.
    #[must_use]
    pub fn new(name: impl Into<String>, catalog: CallbackCatalog) -> Self {
        Self {
            name: name.into(),
            catalog,
        }
    }
}

impl HostDefinition for StaticHostDefinition {
    fn name(&self) -> &str {
        &self.name
    }

    fn callback_catalog(&self) -> CallbackCatalog {
        self.catalog.clone()
    }
}
