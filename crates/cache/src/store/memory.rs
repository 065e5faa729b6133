use std::collections::HashMap;

use super::BackingStore;

/// In-process map-backed store
///
/// Has no locking of its own; the owning cache store serialises access.
#[derive(Debug, Clone)]
pub struct MemoryStore<V> {
    entries: HashMap<String, V>,
}

impl<V> MemoryStore<V> {
    /// Create an empty store
    pub fn new() -> Self {
        Self { entries: HashMap::new() }
    }

    /// Create an empty store with room for `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        Self { entries: HashMap::with_capacity(capacity) }
    }
}

impl<V> Default for MemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + Sync> BackingStore<V> for MemoryStore<V> {
    fn insert(&mut self, key: String, value: V) {
        self.entries.insert(key, value);
    }

    fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn read(&self, key: &str) -> Option<V> {
        self.entries.get(key).cloned()
    }

    fn remove(&mut self, key: &str) -> Option<V> {
        self.entries.remove(key)
    }

    fn read_keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn count(&self) -> usize {
        self.entries.len()
    }
}
