// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The capability every cache exposes.
//!
//! [`Cache`] is deliberately small: `get`, `set` and `evict`, each returning an
//! [`AsyncResult`]. Wrapped third-party caches and composed pipelines implement the same
//! contract, so they can be layered freely.

use std::sync::Arc;

use crate::AsyncResult;

/// Trait for cache implementations.
///
/// Every operation returns immediately with an [`AsyncResult`] tracking the work. Implementations
/// must:
///
/// - reject an unset key (see [`CacheKey`](crate::CacheKey)) with an already-failed result carrying
///   an invalid-argument error, before scheduling any work;
/// - translate native failures with [`Error::caused_by`](crate::Error::caused_by), keeping the
///   original error as the cause;
/// - stay responsible for their own internal synchronization, as operations may run concurrently.
///
/// The trait is object safe, and `Arc<C>` / `Box<C>` delegate to `C`, so a cache can be shared
/// between several pipelines.
pub trait Cache<K, V>: Send + Sync {
    /// Looks up `key`. Completes with `None` when the key is absent, which is not a failure.
    fn get(&self, key: &K) -> AsyncResult<Option<V>>;

    /// Stores `value` under `key`.
    fn set(&self, key: &K, value: V) -> AsyncResult<()>;

    /// Removes `key`.
    fn evict(&self, key: &K) -> AsyncResult<()>;
}

impl<K, V, C> Cache<K, V> for Arc<C>
where
    C: Cache<K, V> + ?Sized,
{
    fn get(&self, key: &K) -> AsyncResult<Option<V>> {
        (**self).get(key)
    }

    fn set(&self, key: &K, value: V) -> AsyncResult<()> {
        (**self).set(key, value)
    }

    fn evict(&self, key: &K) -> AsyncResult<()> {
        (**self).evict(key)
    }
}

impl<K, V, C> Cache<K, V> for Box<C>
where
    C: Cache<K, V> + ?Sized,
{
    fn get(&self, key: &K) -> AsyncResult<Option<V>> {
        (**self).get(key)
    }

    fn set(&self, key: &K, value: V) -> AsyncResult<()> {
        (**self).set(key, value)
    }

    fn evict(&self, key: &K) -> AsyncResult<()> {
        (**self).evict(key)
    }
}
