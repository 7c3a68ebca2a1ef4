// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! In-memory cache store with TTL-aware lookups and explicit invalidation.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tick::Clock;

/// A cached value together with the time it was stored.
///
/// Entries are created from successful remote fetches and replaced wholesale on refresh; they are
/// never mutated in place.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use guaranteed_loader::CacheStore;
/// use tick::Clock;
///
/// let clock = Clock::new_frozen();
/// let store = CacheStore::new(clock.clone());
///
/// store.set("requests:42".to_string(), vec!["algebra"]);
/// let entry = store.get(&"requests:42".to_string()).unwrap();
///
/// assert_eq!(entry.value(), &vec!["algebra"]);
/// assert_eq!(entry.age(clock.instant()), Duration::ZERO);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
}

impl<V> CacheEntry<V> {
    pub(crate) fn new(value: V, stored_at: Instant) -> Self {
        Self { value, stored_at }
    }

    /// Returns a reference to the cached value.
    #[must_use]
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Consumes the entry and returns the cached value.
    #[must_use]
    pub fn into_value(self) -> V {
        self.value
    }

    /// Returns the instant the value was stored.
    #[must_use]
    pub fn stored_at(&self) -> Instant {
        self.stored_at
    }

    /// Returns how long ago the value was stored, relative to `now`.
    ///
    /// Returns [`Duration::ZERO`] if `now` precedes the store time.
    #[must_use]
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.stored_at)
    }

    /// Returns `true` if the entry is younger than `ttl` at `now`.
    #[must_use]
    pub fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        self.age(now) < ttl
    }
}

/// Key-value storage of [`CacheEntry`] values.
///
/// The store is safe to share between threads. Every operation takes the internal lock once, so
/// [`set`](Self::set) and [`clear`](Self::clear) are never observed half-applied.
///
/// There is no eviction besides [`clear`](Self::clear); the store grows with the number of distinct
/// keys it has seen.
pub struct CacheStore<K, V> {
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
    clock: Clock,
}

impl<K, V> std::fmt::Debug for CacheStore<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("len", &self.entries.lock().len())
            .finish_non_exhaustive()
    }
}

impl<K, V> CacheStore<K, V>
where
    K: Hash + Eq,
    V: Clone,
{
    /// Creates an empty store that timestamps entries with `clock`.
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Returns a copy of the entry for `key`, regardless of its age.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<CacheEntry<V>> {
        self.entries.lock().get(key).cloned()
    }

    /// Stores `value` under `key`, replacing any previous entry, and timestamps it with the
    /// current time.
    pub fn set(&self, key: K, value: V) {
        self.set_at(key, value, self.clock.instant());
    }

    /// Stores `value` with an explicit timestamp.
    ///
    /// The store time of a key never goes backwards: if `now` precedes the time of the entry being
    /// replaced, the previous time is kept.
    pub(crate) fn set_at(&self, key: K, value: V, now: Instant) {
        let mut entries = self.entries.lock();
        let stored_at = entries.get(&key).map_or(now, |previous| previous.stored_at.max(now));
        entries.insert(key, CacheEntry::new(value, stored_at));
    }

    /// Returns `true` if an entry exists for `key` and is younger than `ttl`.
    #[must_use]
    pub fn is_fresh(&self, key: &K, ttl: Duration) -> bool {
        let now = self.clock.instant();
        self.entries.lock().get(key).is_some_and(|entry| entry.is_fresh(now, ttl))
    }

    /// Returns the entry for `key` only if it is younger than `ttl`.
    pub(crate) fn get_fresh(&self, key: &K, ttl: Duration) -> Option<CacheEntry<V>> {
        let now = self.clock.instant();
        self.entries
            .lock()
            .get(key)
            .filter(|entry| entry.is_fresh(now, ttl))
            .cloned()
    }

    /// Removes the entry for `key`, or every entry when `key` is `None`.
    pub fn clear(&self, key: Option<&K>) {
        let mut entries = self.entries.lock();
        match key {
            Some(key) => {
                entries.remove(key);
            }
            None => entries.clear(),
        }
    }

    /// Returns the number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Returns the clock used to timestamp entries.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }
}
