// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for configuring in-memory caches.
//!
//! The builder hides moka's configuration types, so they never appear in the public API.

use std::hash::Hash;
use std::marker::PhantomData;
use std::time::Duration;

use stratum_tier::Spawner;

use crate::tier::InMemoryCache;

/// Builder for configuring an [`InMemoryCache`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use stratum_memory::InMemoryCache;
/// use stratum_tier::Spawner;
///
/// let cache = InMemoryCache::<String, i32>::builder(Spawner::new_thread_per_task())
///     .max_capacity(1000)
///     .time_to_live(Duration::from_secs(300))
///     .time_to_idle(Duration::from_secs(60))
///     .initial_capacity(100)
///     .name("my-cache")
///     .build();
/// ```
#[derive(Debug)]
pub struct InMemoryCacheBuilder<K, V> {
    pub(crate) spawner: Spawner,
    pub(crate) max_capacity: Option<u64>,
    pub(crate) initial_capacity: Option<usize>,
    pub(crate) time_to_live: Option<Duration>,
    pub(crate) time_to_idle: Option<Duration>,
    pub(crate) name: Option<String>,
    _phantom: PhantomData<fn() -> (K, V)>,
}

impl<K, V> InMemoryCacheBuilder<K, V> {
    /// Creates a builder for an unbounded cache whose operations run on `spawner`.
    #[must_use]
    pub fn new(spawner: Spawner) -> Self {
        Self {
            spawner,
            max_capacity: None,
            initial_capacity: None,
            time_to_live: None,
            time_to_idle: None,
            name: None,
            _phantom: PhantomData,
        }
    }

    /// Sets the maximum number of entries.
    ///
    /// Once the capacity is reached, entries are evicted with moka's `TinyLFU` policy. Eviction
    /// happens in the background, so the cache may briefly exceed the limit.
    #[must_use]
    pub fn max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = Some(capacity);
        self
    }

    /// Sets a pre-allocation hint.
    #[must_use]
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    /// Expires entries this long after they were written.
    #[must_use]
    pub fn time_to_live(mut self, duration: Duration) -> Self {
        self.time_to_live = Some(duration);
        self
    }

    /// Expires entries this long after they were last read or written.
    #[must_use]
    pub fn time_to_idle(mut self, duration: Duration) -> Self {
        self.time_to_idle = Some(duration);
        self
    }

    /// Names the cache in moka's debugging output.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builds the configured cache.
    #[must_use]
    pub fn build(self) -> InMemoryCache<K, V>
    where
        K: Hash + Eq + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        InMemoryCache::from_builder(self)
    }
}
