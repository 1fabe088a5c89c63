//! Bounded cache with first-in-first-out eviction.
//!
//! Eviction order is insertion order: replacing the value of an existing
//! key keeps its position, and reads never refresh an entry. Key order and
//! the key→value map live under one lock so inserting a key and queueing
//! it for eviction happen atomically.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

/// Default number of entries kept by each provider cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 10;

struct Entries<K, V> {
    order: VecDeque<K>,
    values: HashMap<K, V>,
}

/// Bounded key→value cache evicting the oldest-inserted entry on overflow.
pub struct FifoCache<K, V> {
    capacity: usize,
    entries: Mutex<Entries<K, V>>,
}

impl<K, V> FifoCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Create a cache holding at most `capacity` entries. A capacity of
    /// zero disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(Entries {
                order: VecDeque::with_capacity(capacity),
                values: HashMap::with_capacity(capacity),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.lock().values.get(key).cloned()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.lock().values.contains_key(key)
    }

    /// Insert or replace. Returns the evicted key, if any.
    pub fn insert(&self, key: K, value: V) -> Option<K> {
        if self.capacity == 0 {
            return None;
        }
        let mut entries = self.entries.lock();
        if let Some(slot) = entries.values.get_mut(&key) {
            *slot = value;
            return None;
        }
        entries.order.push_back(key.clone());
        entries.values.insert(key, value);
        if entries.order.len() > self.capacity {
            let evicted = entries.order.pop_front()?;
            entries.values.remove(&evicted);
            return Some(evicted);
        }
        None
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock();
        let value = entries.values.remove(key)?;
        entries.order.retain(|k| k != key);
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys from oldest to newest.
    pub fn keys(&self) -> Vec<K> {
        self.entries.lock().order.iter().cloned().collect()
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        entries.order.clear();
        entries.values.clear();
    }
}
