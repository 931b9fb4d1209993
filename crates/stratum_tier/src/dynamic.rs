// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Dynamic cache wrapper for type erasure.

use std::{fmt::Debug, sync::Arc};

use crate::{AsyncResult, Cache};

/// Extension trait for converting any `Cache` into a `DynamicCache`.
///
/// This trait is automatically implemented for all types that implement `Cache`.
///
/// # Examples
///
/// ```
/// use stratum_tier::{Cache, DynamicCache, DynamicCacheExt};
///
/// fn erase<C>(cache: C) -> DynamicCache<String, i32>
/// where
///     C: Cache<String, i32> + 'static,
/// {
///     cache.into_dynamic()
/// }
/// ```
pub trait DynamicCacheExt<K, V>: Sized {
    /// Converts this cache into a `DynamicCache`.
    fn into_dynamic(self) -> DynamicCache<K, V>;
}

impl<K, V, C> DynamicCacheExt<K, V> for C
where
    C: Cache<K, V> + 'static,
{
    fn into_dynamic(self) -> DynamicCache<K, V> {
        DynamicCache(Arc::new(self))
    }
}

/// A clonable, type-erased cache.
///
/// Use this to build pipelines out of heterogeneous caches without spelling out the nested
/// generic types, or to hold caches of different concrete types in one collection.
pub struct DynamicCache<K, V>(Arc<dyn Cache<K, V>>);

impl<K, V> Debug for DynamicCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicCache").finish()
    }
}

impl<K, V> Clone for DynamicCache<K, V> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<K, V> Cache<K, V> for DynamicCache<K, V> {
    fn get(&self, key: &K) -> AsyncResult<Option<V>> {
        self.0.get(key)
    }

    fn set(&self, key: &K, value: V) -> AsyncResult<()> {
        self.0.set(key, value)
    }

    fn evict(&self, key: &K) -> AsyncResult<()> {
        self.0.evict(key)
    }
}
