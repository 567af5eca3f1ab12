//! Rendered-page memoization table.
//!
//! Maps a page key (the canonical source URL) to the fully rendered response
//! body.  There is no eviction, no TTL and no size bound: entries live until
//! [`KeyedCache::reset`] or process exit.  Only successful renders are ever
//! stored.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tracing::{debug, trace};

/// Append-or-update mapping from a string key to an opaque byte payload.
#[derive(Debug, Default)]
pub struct KeyedCache {
    entries: Mutex<HashMap<String, Bytes>>,
}

impl KeyedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, overwriting any previous value in place.
    pub fn set(&self, key: &str, value: Bytes) {
        let mut entries = self.lock();
        match entries.get_mut(key) {
            Some(slot) => *slot = value,
            None => {
                entries.insert(key.to_owned(), value);
            }
        }
        trace!(key, "page cache set");
    }

    /// Return the payload stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.lock().get(key).cloned()
    }

    /// Drop every entry.  The backing allocation is kept for reuse.
    pub fn reset(&self) {
        let mut entries = self.lock();
        let dropped = entries.len();
        entries.clear();
        debug!(dropped, "page cache reset");
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Number of entries the cache can hold without reallocating.
    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Bytes>> {
        // Entries are plain values; a panic mid-update cannot leave one half-written.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
