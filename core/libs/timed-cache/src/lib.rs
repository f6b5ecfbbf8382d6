//! Session-scoped TTL cache
//!
//! A single cache component with a get/put/invalidate/clear contract,
//! replacing scattered dictionaries with parallel timestamp maps. Entries
//! expire a fixed duration after they were stored; expired entries are
//! dropped lazily on access.
//!
//! The cache is owned by one session's sequential call flow and is not
//! internally synchronized; multi-threaded callers must wrap it in their own
//! mutex or keep it on an owner thread.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};
use tracing::debug;

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

/// A bounded-lifetime key/value cache
pub struct TimedCache<K, V> {
    ttl: Duration,
    entries: HashMap<K, Entry<V>>,
}

impl<K: Eq + Hash + Clone, V> TimedCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Fetch a live entry, dropping it first if it has expired
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.stored_at.elapsed() >= self.ttl,
            None => return None,
        };
        if expired {
            self.entries.remove(key);
            debug!("cache entry expired");
            return None;
        }
        self.entries.get(key).map(|entry| &entry.value)
    }

    pub fn put(&mut self, key: K, value: V) {
        self.entries.insert(
            key,
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop every entry whose key matches the predicate, regardless of age
    pub fn invalidate_where(&mut self, mut pred: impl FnMut(&K) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !pred(key));
        let dropped = before - self.entries.len();
        if dropped > 0 {
            debug!("invalidated {} cache entries", dropped);
        }
        dropped
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of stored entries, including any not yet lazily expired
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
