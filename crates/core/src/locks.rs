//! Per-key critical sections.

use std::hash::Hash;
use std::sync::{Arc, Mutex};

use dashmap::DashMap;

/// A table of independent mutexes, one per key.
///
/// Work on one key is serialised; work on different keys never contends
/// beyond the brief shard lookup.
#[derive(Debug)]
pub struct KeyedLocks<K>
where
    K: Eq + Hash,
{
    locks: DashMap<K, Arc<Mutex<()>>>,
}

impl<K> Default for KeyedLocks<K>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `key`.
    ///
    /// A poisoned lock is recovered: the guarded data is `()`, so there is no
    /// state a panicking holder could have left half-written.
    pub fn with_lock<R>(&self, key: &K, f: impl FnOnce() -> R) -> R {
        let lock = Arc::clone(&self.locks.entry(key.clone()).or_default());
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f()
    }

    /// Number of keys that have been locked at least once.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
