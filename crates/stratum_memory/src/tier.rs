// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! In-memory cache implementation using moka.

use std::fmt::Debug;
use std::hash::Hash;

use moka::future::Cache as MokaCache;
use stratum_tier::key::reject_unset;
use stratum_tier::{AsyncResult, Cache, CacheKey, Spawner};

use crate::builder::InMemoryCacheBuilder;

/// An in-memory cache backed by moka.
///
/// Every operation runs on the [`Spawner`] the cache was built with and returns an
/// [`AsyncResult`] right away. Clones share the same storage.
///
/// # Examples
///
/// ```
/// use stratum_memory::InMemoryCache;
/// use stratum_tier::{Cache, Spawner};
///
/// let cache = InMemoryCache::<String, i32>::new(Spawner::new_thread_per_task());
///
/// cache.set(&"key".to_string(), 42).join().unwrap();
/// assert_eq!(cache.get(&"key".to_string()).join().unwrap(), Some(42));
/// ```
pub struct InMemoryCache<K, V> {
    inner: MokaCache<K, V>,
    spawner: Spawner,
}

impl<K, V> Clone for InMemoryCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            spawner: self.spawner.clone(),
        }
    }
}

impl<K, V> Debug for InMemoryCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCache")
            .field("name", &self.inner.name())
            .field("spawner", &self.spawner)
            .finish_non_exhaustive()
    }
}

impl<K, V> InMemoryCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates an unbounded cache.
    #[must_use]
    pub fn new(spawner: Spawner) -> Self {
        Self::builder(spawner).build()
    }

    /// Creates a cache holding roughly `max_capacity` entries.
    #[must_use]
    pub fn with_capacity(spawner: Spawner, max_capacity: u64) -> Self {
        Self::builder(spawner).max_capacity(max_capacity).build()
    }

    /// Creates a builder for time-based expiration and other options.
    #[must_use]
    pub fn builder(spawner: Spawner) -> InMemoryCacheBuilder<K, V> {
        InMemoryCacheBuilder::new(spawner)
    }

    pub(crate) fn from_builder(builder: InMemoryCacheBuilder<K, V>) -> Self {
        let mut moka_builder = MokaCache::builder();

        if let Some(capacity) = builder.max_capacity {
            moka_builder = moka_builder.max_capacity(capacity);
        }

        if let Some(capacity) = builder.initial_capacity {
            moka_builder = moka_builder.initial_capacity(capacity);
        }

        if let Some(ttl) = builder.time_to_live {
            moka_builder = moka_builder.time_to_live(ttl);
        }

        if let Some(tti) = builder.time_to_idle {
            moka_builder = moka_builder.time_to_idle(tti);
        }

        if let Some(name) = builder.name.as_deref() {
            moka_builder = moka_builder.name(name);
        }

        Self {
            inner: moka_builder.build(),
            spawner: builder.spawner,
        }
    }

    /// Returns the approximate number of entries.
    ///
    /// Moka applies writes and evictions in the background, so the count may lag behind.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

impl<K, V> Cache<K, V> for InMemoryCache<K, V>
where
    K: CacheKey + Clone + Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, key: &K) -> AsyncResult<Option<V>> {
        if let Some(rejected) = reject_unset(key) {
            return rejected;
        }

        let (inner, key) = (self.inner.clone(), key.clone());
        AsyncResult::spawn(&self.spawner, async move { Ok(inner.get(&key).await) })
    }

    fn set(&self, key: &K, value: V) -> AsyncResult<()> {
        if let Some(rejected) = reject_unset(key) {
            return rejected;
        }

        let (inner, key) = (self.inner.clone(), key.clone());
        AsyncResult::spawn(&self.spawner, async move {
            inner.insert(key, value).await;
            Ok(())
        })
    }

    fn evict(&self, key: &K) -> AsyncResult<()> {
        if let Some(rejected) = reject_unset(key) {
            return rejected;
        }

        let (inner, key) = (self.inner.clone(), key.clone());
        AsyncResult::spawn(&self.spawner, async move {
            inner.invalidate(&key).await;
            Ok(())
        })
    }
}
