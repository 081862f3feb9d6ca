// Copyright (c) The Airbag Project Authors.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Bounded TTL result store for the airbag resilience engine.
//!
//! This crate provides [`TtlCache`], a capacity-bounded key/value map where every
//! entry carries its own time-to-live. It backs the result-caching pre-filter of
//! the `airbag` command executor and is intentionally narrow in scope: it is not
//! a general-purpose cache and has no tiers, loaders, or stampede protection.
//!
//! # Expiration
//!
//! Entries expire **passively**. There is no background sweeper:
//!
//! - a read that finds an expired entry removes it and reports a miss,
//! - a write evicts all expired entries before making room for the new one.
//!
//! # Bounded Capacity
//!
//! The cache never holds more than the capacity given at construction. When a
//! write finds the cache full after expired entries have been purged, the entry
//! closest to its expiry is evicted to make room.
//!
//! # Time Source
//!
//! Expiry is measured with [`tokio::time::Instant`], so tests running under the
//! paused tokio clock (`start_paused`) can advance time deterministically
//! instead of sleeping.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use airbag_cache::TtlCache;
//!
//! let cache: TtlCache<String, u32> = TtlCache::new(128);
//! cache.insert("answer".to_string(), 42, Duration::from_secs(60));
//! assert_eq!(cache.get(&"answer".to_string()), Some(42));
//! assert_eq!(cache.get(&"missing".to_string()), None);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// A capacity-bounded key/value store with per-entry time-to-live.
///
/// All operations take `&self`; interior mutability is provided by a mutex with
/// narrow critical sections, so a `TtlCache` can be shared across concurrent
/// tasks behind an `Arc` (or embedded in a shared structure) without further
/// locking.
///
/// Values are returned by clone; keep them cheap to clone (or wrap them in an
/// `Arc`) when entries are large.
pub struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, Entry<V>>>,
    capacity: usize,
}

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Creates a cache holding at most `capacity` live entries.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be at least 1");
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    /// Returns the stored value for `key` if it exists and has not expired.
    ///
    /// An expired entry found by this lookup is removed before reporting a miss.
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Stores `value` under `key`, expiring `ttl` from now.
    ///
    /// Replaces any previous entry for the same key. When the cache is full,
    /// expired entries are purged first; if it is still full, the entry closest
    /// to its expiry is evicted.
    ///
    /// A zero `ttl` stores an entry that is already expired, which every
    /// subsequent read treats as a miss; callers that want "no caching" should
    /// skip the insert instead.
    pub fn insert(&self, key: K, value: V, ttl: Duration) {
        let now = Instant::now();
        let expires_at = now + ttl;
        let mut entries = self.entries.lock();

        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            entries.retain(|_, entry| entry.expires_at > now);

            if entries.len() >= self.capacity {
                let soonest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.expires_at)
                    .map(|(k, _)| k.clone());
                if let Some(k) = soonest {
                    entries.remove(&k);
                }
            }
        }

        entries.insert(key, Entry { value, expires_at });
    }

    /// Removes the entry for `key`, returning its value if it was present and
    /// not expired.
    pub fn remove(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let entry = self.entries.lock().remove(key)?;
        (entry.expires_at > now).then_some(entry.value)
    }

    /// Returns the number of live (unexpired) entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .values()
            .filter(|entry| entry.expires_at > now)
            .count()
    }

    /// Returns `true` if the cache holds no live entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes all entries.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Returns the maximum number of entries this cache can hold.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<K, V> fmt::Debug for TtlCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlCache")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}
