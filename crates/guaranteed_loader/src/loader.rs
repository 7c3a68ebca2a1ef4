// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::hash::Hash;
use std::sync::Arc;

use tick::Clock;
use uniflight::{LeaderPanicked, Merger};

use crate::retry::fetch_with_retries;
use crate::telemetry::{LoadActivity, LoaderTelemetry};
use crate::{CacheEntry, CacheStore, Error, FetchFailure, LoadOptions, LoadPolicy, LoadResult, LoaderBuilder, RemoteSource};

/// Loads values through a chain of increasingly degraded sources, and never fails.
///
/// Each [`load`](Self::load) walks these steps in order and stops at the first that yields a value:
///
/// 1. a cached value younger than the TTL ([`Origin::FreshCache`][crate::Origin::FreshCache]);
/// 2. the remote source, retried with backoff and a per-attempt timeout
///    ([`Origin::Remote`][crate::Origin::Remote]), whose result is cached;
/// 3. a cached value of any age ([`Origin::StaleCache`][crate::Origin::StaleCache]);
/// 4. the fallback from the call's [`LoadOptions`] ([`Origin::Fallback`][crate::Origin::Fallback]).
///
/// Concurrent loads of the same key share a single remote fetch. The fetch runs with the policy of
/// the call that leads it, and every caller receives its outcome; callers that observe a failure
/// then apply their own stale-cache and fallback steps.
///
/// The loader is a cheap handle around shared state: clones observe the same cache.
///
/// # Examples
///
/// ```
/// use guaranteed_loader::{GuaranteedLoader, LoadOptions, Origin};
/// use tick::Clock;
///
/// # futures::executor::block_on(async {
/// let loader = GuaranteedLoader::<String, Vec<String>>::new(Clock::new_frozen());
/// let fetch_requests = || async { Ok::<_, std::io::Error>(vec!["algebra".to_string()]) };
///
/// let first = loader
///     .load("requests:42".to_string(), fetch_requests, LoadOptions::new(Vec::new()))
///     .await;
/// assert_eq!(first.origin(), Origin::Remote);
///
/// let second = loader
///     .load("requests:42".to_string(), fetch_requests, LoadOptions::new(Vec::new()))
///     .await;
/// assert_eq!(second.origin(), Origin::FreshCache);
/// assert_eq!(second.value(), first.value());
/// # });
/// ```
pub struct GuaranteedLoader<K, V> {
    inner: Arc<LoaderInner<K, V>>,
}

struct LoaderInner<K, V> {
    name: &'static str,
    policy: LoadPolicy,
    clock: Clock,
    store: CacheStore<K, V>,
    fetches: Merger<K, SharedFetch<V>>,
    telemetry: LoaderTelemetry,
}

/// Outcome of a fetch shared by every caller that joined it.
type SharedFetch<V> = Result<Fetched<V>, FetchFailure>;

#[derive(Debug, Clone)]
enum Fetched<V> {
    /// Another fetch stored a fresh value before this one started.
    Cached(CacheEntry<V>),
    Remote(V),
}

impl<K, V> Clone for GuaranteedLoader<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> std::fmt::Debug for GuaranteedLoader<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuaranteedLoader")
            .field("name", &self.inner.name)
            .field("policy", &self.inner.policy)
            .field("store", &self.inner.store)
            .finish_non_exhaustive()
    }
}

impl<K, V> GuaranteedLoader<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a loader with the default [`LoadPolicy`].
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self::from_parts(
            crate::builder::DEFAULT_NAME,
            LoadPolicy::default(),
            clock,
            LoaderTelemetry::default(),
        )
    }

    /// Creates a builder for a loader with a custom name, policy or telemetry.
    #[must_use]
    pub fn builder(clock: Clock) -> LoaderBuilder<K, V> {
        LoaderBuilder::new(clock)
    }

    pub(crate) fn from_parts(name: &'static str, policy: LoadPolicy, clock: Clock, telemetry: LoaderTelemetry) -> Self {
        Self {
            inner: Arc::new(LoaderInner {
                name,
                policy,
                store: CacheStore::new(clock.clone()),
                fetches: Merger::new(),
                clock,
                telemetry,
            }),
        }
    }

    /// Loads the value for `key`.
    ///
    /// The future always resolves to a value; backend errors, timeouts and panics raised by
    /// `source` are recorded in the result's [`failure`](LoadResult::failure) instead of being
    /// returned.
    pub async fn load<S>(&self, key: K, source: S, options: LoadOptions<V>) -> LoadResult<V>
    where
        S: RemoteSource<V> + Send + Sync,
    {
        let (policy, fallback) = options.resolve(self.inner.policy);

        if let Some(entry) = self.inner.store.get_fresh(&key, policy.ttl()) {
            return self.fresh(entry);
        }

        let mut led = false;
        let shared = self
            .inner
            .fetches
            .execute(&key, || {
                led = true;
                Box::pin(self.fetch(&key, &source, &policy))
            })
            .await;

        if !led {
            self.inner.telemetry.record(self.inner.name, LoadActivity::Coalesced, None, None);
        }

        match shared.unwrap_or_else(|panicked| Err(leader_panicked(&panicked))) {
            Ok(Fetched::Cached(entry)) => self.fresh(entry),
            Ok(Fetched::Remote(value)) => LoadResult::remote(value),
            Err(failure) => self.degrade(&key, failure, fallback),
        }
    }

    /// Loads the value for `key`, falling back to `V::default()`.
    pub async fn load_or_default<S>(&self, key: K, source: S) -> LoadResult<V>
    where
        S: RemoteSource<V> + Send + Sync,
        V: Default,
    {
        self.load(key, source, LoadOptions::new(V::default())).await
    }

    /// Returns the cached entry for `key` regardless of its age, without fetching.
    #[must_use]
    pub fn peek(&self, key: &K) -> Option<CacheEntry<V>> {
        self.inner.store.get(key)
    }

    /// Returns `true` if `key` has a cached value younger than the loader's TTL.
    #[must_use]
    pub fn is_fresh(&self, key: &K) -> bool {
        self.inner.store.is_fresh(key, self.inner.policy.ttl())
    }

    /// Removes the cached value for `key`, or every cached value when `key` is `None`.
    ///
    /// Fetches already in flight are not affected and store their result when they complete.
    pub fn clear(&self, key: Option<&K>) {
        self.inner.store.clear(key);
    }

    /// Returns the number of cached values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.store.len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.store.is_empty()
    }

    /// Returns the name used in logs and metrics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    /// Returns the clock used for freshness checks, backoff and timeouts.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.inner.clock
    }

    /// Returns the default policy applied to loads.
    #[must_use]
    pub fn policy(&self) -> LoadPolicy {
        self.inner.policy
    }

    /// Runs the remote fetch on behalf of every caller joined on `key`.
    ///
    /// A caller may join after an earlier fetch already stored a fresh value, so the cache is
    /// checked again first. The value is cached before the outcome is handed to the callers.
    async fn fetch<S>(&self, key: &K, source: &S, policy: &LoadPolicy) -> SharedFetch<V>
    where
        S: RemoteSource<V>,
    {
        let inner = &self.inner;

        if let Some(entry) = inner.store.get_fresh(key, policy.ttl()) {
            return Ok(Fetched::Cached(entry));
        }

        let value = fetch_with_retries(source, policy, &inner.clock, &inner.telemetry, inner.name).await?;
        inner.store.set(key.clone(), value.clone());
        Ok(Fetched::Remote(value))
    }

    fn fresh(&self, entry: CacheEntry<V>) -> LoadResult<V> {
        let inner = &self.inner;
        inner.telemetry.record(inner.name, LoadActivity::FreshHit, None, None);

        let age = entry.age(inner.clock.instant());
        LoadResult::fresh(entry.into_value(), age)
    }

    fn degrade(&self, key: &K, failure: FetchFailure, fallback: V) -> LoadResult<V> {
        let inner = &self.inner;

        if let Some(entry) = inner.store.get(key) {
            inner.telemetry.record(inner.name, LoadActivity::Stale, None, None);
            let age = entry.age(inner.clock.instant());
            return LoadResult::stale(entry.into_value(), age, failure);
        }

        inner.telemetry.record(inner.name, LoadActivity::Fallback, None, None);
        LoadResult::fallback(fallback, failure)
    }
}

/// Failure reported when the fetch itself panicked outside the source; no attempt finished.
fn leader_panicked(panicked: &LeaderPanicked) -> FetchFailure {
    FetchFailure::new(0, Error::panicked(panicked.message().to_string()))
}
