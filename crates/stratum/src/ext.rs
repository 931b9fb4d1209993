// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use stratum_tier::Cache;

use crate::ComposedCache;

/// Adds [`compose`](CacheExt::compose) to every [`Cache`].
///
/// # Examples
///
/// ```
/// use stratum_tier::testing::FakeCache;
/// use stratum::{Cache, CacheExt, Spawner};
///
/// let spawner = Spawner::new_thread_per_task();
/// let l1 = FakeCache::<String, i32>::new(spawner.clone());
/// let l2 = FakeCache::<String, i32>::new(spawner.clone());
/// let l3 = FakeCache::<String, i32>::new(spawner);
/// l3.seed("key".to_string(), 3);
///
/// let cache = l1.clone().compose(l2.clone()).compose(l3);
/// assert_eq!(cache.get(&"key".to_string()).join().unwrap(), Some(3));
/// ```
pub trait CacheExt<K, V>: Cache<K, V> + Sized {
    /// Chains `self` in front of `other`.
    ///
    /// `self` becomes the first cache and `other` the second one of the returned
    /// [`ComposedCache`]. Building the composition has no side effects.
    fn compose<S>(self, other: S) -> ComposedCache<K, V, Self, S>
    where
        S: Cache<K, V>,
    {
        ComposedCache::new(self, other)
    }
}

impl<K, V, C> CacheExt<K, V> for C where C: Cache<K, V> {}
