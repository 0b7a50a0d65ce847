//! Keyed store shared between the pass driver and its workers.

use parking_lot::Mutex;
use std::{collections::BTreeMap, sync::Arc};

/// An insertion-order-independent map from a stable region index to a
/// shared value.
///
/// All operations serialize under one lock. Values are reference counted,
/// so a reader handed out by [`get`](SharedMap::get) stays usable after an
/// intervening [`erase`](SharedMap::erase). Iteration is in ascending key
/// order.
pub struct SharedMap<V> {
    inner: Mutex<BTreeMap<u32, Arc<V>>>,
}

impl<V> SharedMap<V> {
    pub fn new() -> SharedMap<V> {
        SharedMap {
            inner: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn insert(&self, key: u32, value: Arc<V>) {
        self.inner.lock().insert(key, value);
    }

    /// Remove the entry for `key`, returning whether it was present.
    pub fn erase(&self, key: u32) -> bool {
        self.inner.lock().remove(&key).is_some()
    }

    pub fn contains(&self, key: u32) -> bool {
        self.inner.lock().contains_key(&key)
    }

    pub fn get(&self, key: u32) -> Option<Arc<V>> {
        self.inner.lock().get(&key).cloned()
    }

    /// The value under the smallest key, if any.
    pub fn first(&self) -> Option<Arc<V>> {
        self.inner.lock().values().next().cloned()
    }

    /// Apply `f` to every entry in ascending key order.
    pub fn for_each(&self, mut f: impl FnMut(u32, &Arc<V>)) {
        for (key, value) in self.inner.lock().iter() {
            f(*key, value);
        }
    }

    /// Snapshot of all keys in ascending order.
    pub fn keys(&self) -> Vec<u32> {
        self.inner.lock().keys().copied().collect()
    }

    /// Snapshot of all values in ascending key order.
    pub fn values(&self) -> Vec<Arc<V>> {
        self.inner.lock().values().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }
}

impl<V> Default for SharedMap<V> {
    fn default() -> Self {
        Self::new()
    }
}
