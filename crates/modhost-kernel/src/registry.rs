//! Installed module registry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use modhost_core::{ModuleId, ModuleManifest, SlotId};

/// An installed module as the host remembers it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledModule {
    /// Module identity.
    pub id: ModuleId,
    /// The slot bound to it.
    pub slot: SlotId,
    /// Manifest snapshot taken at install (or last update). All bookkeeping
    /// removal is driven by this snapshot.
    pub manifest: ModuleManifest,
}

/// The set of installed modules, keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleRegistry {
    modules: BTreeMap<ModuleId, InstalledModule>,
}

impl ModuleRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module. Returns `false` if the id was already present, in which
    /// case nothing changes.
    pub(crate) fn insert(&mut self, module: InstalledModule) -> bool {
        if self.modules.contains_key(&module.id) {
            return false;
        }
        self.modules.insert(module.id.clone(), module);
        true
    }

    pub(crate) fn remove(&mut self, id: &ModuleId) -> Option<InstalledModule> {
        self.modules.remove(id)
    }

    /// Look up a module.
    #[must_use]
    pub fn get(&self, id: &ModuleId) -> Option<&InstalledModule> {
        self.modules.get(id)
    }

    /// Whether a module is installed.
    #[must_use]
    pub fn contains(&self, id: &ModuleId) -> bool {
        self.modules.contains_key(id)
    }

    /// Iterate over installed modules in id order.
    pub fn iter(&self) -> impl Iterator<Item = &InstalledModule> {
        self.modules.values()
    }

    /// Number of installed modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether nothing is installed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn installed(id: &str, slot: u64) -> InstalledModule {
        InstalledModule {
            id: ModuleId::from_static(id),
            slot: SlotId::new(slot),
            manifest: ModuleManifest::new(),
        }
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let mut registry = ModuleRegistry::new();
        assert!(registry.insert(installed("fees", 0)));
        assert!(!registry.insert(installed("fees", 1)));
        assert_eq!(registry.get(&ModuleId::from_static("fees")).unwrap().slot, SlotId::new(0));
    }

    #[test]
    fn test_iterates_sorted_by_id() {
        let mut registry = ModuleRegistry::new();
        registry.insert(installed("royalty", 0));
        registry.insert(installed("allowlist", 1));
        let ids: Vec<&str> = registry.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["allowlist", "royalty"]);
    }

    #[test]
    fn test_remove() {
        let mut registry = ModuleRegistry::new();
        registry.insert(installed("fees", 0));
        assert!(registry.remove(&ModuleId::from_static("fees")).is_some());
        assert!(!registry.contains(&ModuleId::from_static("fees")));
        assert!(registry.is_empty());
    }
}
