//! Host-owned extension state.
//!
//! Modules never own their state. Each slot gets a [`ModuleStorage`]
//! namespace inside the host's [`StateStore`], and a module only ever sees a
//! handle to its own slot's namespace. Because the namespace is keyed by the
//! slot rather than the implementation, it survives updates and uninstalls.

use std::collections::BTreeMap;

use modhost_core::{Payload, SlotId};

/// Key-value state bound to one slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleStorage {
    entries: BTreeMap<String, Payload>,
}

impl ModuleStorage {
    /// Create empty storage.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Read a value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Payload> {
        self.entries.get(key)
    }

    /// Write a value, returning the previous one.
    pub fn set(&mut self, key: impl Into<String>, value: Payload) -> Option<Payload> {
        self.entries.insert(key.into(), value)
    }

    /// Remove a value, returning it.
    pub fn remove(&mut self, key: &str) -> Option<Payload> {
        self.entries.remove(key)
    }

    /// Whether a key is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterate over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Payload)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// All slot storage owned by one host.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateStore {
    slots: BTreeMap<SlotId, ModuleStorage>,
}

impl StateStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Storage of a slot, if the slot was ever allocated.
    #[must_use]
    pub fn get(&self, slot: SlotId) -> Option<&ModuleStorage> {
        self.slots.get(&slot)
    }

    /// Storage of a slot, created empty on first use.
    pub(crate) fn create(&mut self, slot: SlotId) -> &mut ModuleStorage {
        self.slots.entry(slot).or_default()
    }

    /// Drop a slot's storage. Only used when undoing a change.
    pub(crate) fn discard(&mut self, slot: SlotId) {
        self.slots.remove(&slot);
    }

    pub(crate) fn replace(&mut self, slot: SlotId, storage: ModuleStorage) {
        self.slots.insert(slot, storage);
    }

    /// Write `key` in a slot, recording how to undo it in `log`.
    pub(crate) fn set_logged(
        &mut self,
        slot: SlotId,
        key: String,
        value: Payload,
        log: &mut WriteLog,
    ) -> Option<Payload> {
        if !self.slots.contains_key(&slot) {
            log.entries.push(WriteUndo::SlotCreated(slot));
        }
        let previous = self.create(slot).set(key.clone(), value);
        log.entries.push(WriteUndo::Entry {
            slot,
            key,
            previous: previous.clone(),
        });
        previous
    }

    /// Remove `key` from a slot, recording how to undo it in `log`.
    pub(crate) fn remove_logged(
        &mut self,
        slot: SlotId,
        key: &str,
        log: &mut WriteLog,
    ) -> Option<Payload> {
        let previous = self.slots.get_mut(&slot)?.remove(key)?;
        log.entries.push(WriteUndo::Entry {
            slot,
            key: key.to_owned(),
            previous: Some(previous.clone()),
        });
        Some(previous)
    }

    /// Number of slots with storage.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no slot has storage.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// A reversible write made during a forwarded invocation.
#[derive(Debug)]
enum WriteUndo {
    SlotCreated(SlotId),
    Entry {
        slot: SlotId,
        key: String,
        previous: Option<Payload>,
    },
}

/// Writes made during one top-level request, oldest first.
///
/// Each invocation remembers the log length when it starts and reverts
/// back to that mark if it fails, so only what the failed unit touched is
/// undone.
#[derive(Debug, Default)]
pub(crate) struct WriteLog {
    entries: Vec<WriteUndo>,
}

impl WriteLog {
    pub(crate) fn mark(&self) -> usize {
        self.entries.len()
    }

    /// Undo every write recorded after `mark`, newest first.
    pub(crate) fn revert_to(&mut self, mark: usize, state: &mut StateStore) {
        if mark >= self.entries.len() {
            return;
        }
        for undo in self.entries.drain(mark..).rev() {
            match undo {
                WriteUndo::SlotCreated(slot) => state.discard(slot),
                WriteUndo::Entry {
                    slot,
                    key,
                    previous: Some(value),
                } => {
                    state.create(slot).set(key, value);
                },
                WriteUndo::Entry {
                    slot,
                    key,
                    previous: None,
                } => {
                    if let Some(storage) = state.slots.get_mut(&slot) {
                        storage.remove(&key);
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_storage_set_get_remove() {
        let mut storage = ModuleStorage::new();
        assert!(storage.set("value", json!(42)).is_none());
        assert_eq!(storage.set("value", json!(43)), Some(json!(42)));
        assert_eq!(storage.get("value"), Some(&json!(43)));
        assert!(storage.contains_key("value"));
        assert_eq!(storage.remove("value"), Some(json!(43)));
        assert!(storage.is_empty());
    }

    #[test]
    fn test_storage_iterates_in_key_order() {
        let mut storage = ModuleStorage::new();
        storage.set("b", json!(2));
        storage.set("a", json!(1));
        let keys: Vec<&str> = storage.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_write_log_reverts_to_mark() {
        let slot = SlotId::new(0);
        let mut store = StateStore::new();
        let mut log = WriteLog::default();
        store.set_logged(slot, "count".to_owned(), json!(1), &mut log);
        store.set_logged(slot, "owner".to_owned(), json!("alice"), &mut log);
        let after_first = store.clone();

        let mark = log.mark();
        store.set_logged(slot, "count".to_owned(), json!(2), &mut log);
        store.remove_logged(slot, "owner", &mut log);
        store.set_logged(slot, "fresh".to_owned(), json!(true), &mut log);
        assert!(store.remove_logged(slot, "missing", &mut log).is_none());

        log.revert_to(mark, &mut store);
        assert_eq!(store, after_first);
        assert_eq!(log.mark(), mark);

        log.revert_to(0, &mut store);
        assert_eq!(store, StateStore::new());
    }

    #[test]
    fn test_write_log_leaves_untouched_slots_alone() {
        let mut store = StateStore::new();
        store.create(SlotId::new(1)).set("big", json!([1, 2, 3]));
        let before = store.clone();

        let mut log = WriteLog::default();
        store.set_logged(SlotId::new(0), "k".to_owned(), json!("v"), &mut log);
        log.revert_to(0, &mut store);
        assert_eq!(store, before);
    }

    #[test]
    fn test_store_snapshot_restore() {
        let mut store = StateStore::new();
        store.create(SlotId::new(0)).set("count", json!(1));
        let snapshot = store.clone();

        store.create(SlotId::new(0)).set("count", json!(2));
        store.create(SlotId::new(1));
        assert_ne!(store, snapshot);

        store = snapshot;
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(SlotId::new(0)).unwrap().get("count"), Some(&json!(1)));
    }

    #[test]
    fn test_discard_and_replace() {
        let mut store = StateStore::new();
        store.create(SlotId::new(3));
        store.discard(SlotId::new(3));
        assert!(store.get(SlotId::new(3)).is_none());

        let mut storage = ModuleStorage::new();
        storage.set("k", json!("v"));
        store.replace(SlotId::new(3), storage.clone());
        assert_eq!(store.get(SlotId::new(3)), Some(&storage));
    }
}
