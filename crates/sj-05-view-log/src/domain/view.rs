//! Latest-value-per-key view.

use shared_types::Event;
use std::collections::{BTreeMap, HashMap};

/// Folds a stream into `key -> latest event`.
///
/// "Latest" means last arrived, not largest event time: an older event that
/// arrives late still replaces the current entry.
#[derive(Debug, Clone)]
pub struct MaterializedView<V> {
    entries: HashMap<String, Event<V>>,
    updates: u64,
}

impl<V> MaterializedView<V> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            updates: 0,
        }
    }

    /// Upsert by key. Returns the entry that was replaced, if any.
    pub fn apply(&mut self, event: Event<V>) -> Option<Event<V>> {
        self.updates += 1;
        self.entries.insert(event.key.clone(), event)
    }

    pub fn get(&self, key: &str) -> Option<&Event<V>> {
        self.entries.get(key)
    }

    /// Distinct keys held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Events applied so far, including ones that were later superseded.
    pub fn updates(&self) -> u64 {
        self.updates
    }
}

impl<V: Clone> MaterializedView<V> {
    /// Current contents ordered by key.
    pub fn snapshot(&self) -> BTreeMap<String, Event<V>> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl<V> Default for MaterializedView<V> {
    fn default() -> Self {
        Self::new()
    }
}
