// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Two-cache composition.
//!
//! This module provides [`ComposedCache`], which reads through a first cache into a second one,
//! writes found values back to the first, and fans writes and evictions out to both.

use std::{fmt::Debug, marker::PhantomData, sync::Arc};

use stratum_tier::key::reject_unset;
use stratum_tier::{AsyncResult, Cache, CacheKey, Completer, Operation, Outcome};

use crate::fan_out::fan_out;
use crate::telemetry::{self, CacheActivity};

/// Policy for writing values found in the second cache back to the first one.
///
/// # Examples
///
/// ```
/// use stratum::WriteBackPolicy;
///
/// // Always write back (default)
/// let policy = WriteBackPolicy::<String>::always();
///
/// // Never write back
/// let policy = WriteBackPolicy::<String>::never();
///
/// // Only write back short values
/// let policy = WriteBackPolicy::when(|value: &String| value.len() < 1024);
/// ```
pub struct WriteBackPolicy<V>(PolicyType<V>);

enum PolicyType<V> {
    Always,
    Never,
    When(Arc<dyn Fn(&V) -> bool + Send + Sync>),
}

impl<V> Debug for PolicyType<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Always => write!(f, "Always"),
            Self::Never => write!(f, "Never"),
            Self::When(_) => write!(f, "When(<closure>)"),
        }
    }
}

impl<V> Debug for WriteBackPolicy<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("WriteBackPolicy").field(&self.0).finish()
    }
}

impl<V> Default for WriteBackPolicy<V> {
    fn default() -> Self {
        Self::always()
    }
}

impl<V> Clone for WriteBackPolicy<V> {
    fn clone(&self) -> Self {
        Self(match &self.0 {
            PolicyType::Always => PolicyType::Always,
            PolicyType::Never => PolicyType::Never,
            PolicyType::When(predicate) => PolicyType::When(Arc::clone(predicate)),
        })
    }
}

impl<V> WriteBackPolicy<V> {
    /// Writes every value found in the second cache back to the first one.
    #[must_use]
    pub fn always() -> Self {
        Self(PolicyType::Always)
    }

    /// Never writes back; the first cache only holds values stored through `set`.
    #[must_use]
    pub fn never() -> Self {
        Self(PolicyType::Never)
    }

    /// Writes back the values for which `predicate` returns `true`.
    pub fn when<F>(predicate: F) -> Self
    where
        F: Fn(&V) -> bool + Send + Sync + 'static,
    {
        Self(PolicyType::When(Arc::new(predicate)))
    }

    #[inline]
    pub(crate) fn should_write_back(&self, value: &V) -> bool {
        match &self.0 {
            PolicyType::Always => true,
            PolicyType::Never => false,
            PolicyType::When(predicate) => predicate(value),
        }
    }
}

/// A cache formed by chaining two caches.
///
/// - `get` asks the first cache, then the second one on a miss. A value found in the second cache
///   is written back to the first one without waiting for that write; its failure is logged and
///   otherwise ignored. A failure of the first cache fails the lookup without consulting the
///   second one.
/// - `set` and `evict` are dispatched to both caches at once and complete when both have. If
///   either fails, the operation fails with an [`AggregatedFailure`](crate::AggregatedFailure)
///   naming the failed branches, `firstCache` before `secondCache`.
/// - Cancelling a returned [`AsyncResult`] releases its waiters immediately and asks the
///   in-flight branch operations to stop.
///
/// Both caches are held by value; pass an `Arc` or a [`DynamicCache`](crate::DynamicCache) to
/// keep using a cache outside the composition. A `ComposedCache` is itself a [`Cache`], so
/// compositions nest: `a.compose(b).compose(c)` is a three-level cascade.
///
/// # Examples
///
/// ```
/// use stratum::{Cache, CacheExt, InMemoryCache, Spawner};
///
/// # #[tokio::main]
/// # async fn main() -> stratum::Result<()> {
/// let spawner = Spawner::new_tokio();
/// let near = InMemoryCache::<String, String>::builder(spawner.clone()).max_capacity(100).build();
/// let far = InMemoryCache::<String, String>::builder(spawner).build();
///
/// let cache = near.compose(far);
/// let key = "user:1".to_string();
///
/// cache.set(&key, "Alice".to_string()).await?;
/// assert_eq!(cache.get(&key).await?, Some("Alice".to_string()));
/// # Ok(())
/// # }
/// ```
pub struct ComposedCache<K, V, F, S> {
    first: Arc<F>,
    second: Arc<S>,
    policy: WriteBackPolicy<V>,
    _key: PhantomData<fn() -> K>,
}

impl<K, V, F, S> Debug for ComposedCache<K, V, F, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComposedCache")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl<K, V, F, S> Clone for ComposedCache<K, V, F, S> {
    fn clone(&self) -> Self {
        Self {
            first: Arc::clone(&self.first),
            second: Arc::clone(&self.second),
            policy: self.policy.clone(),
            _key: PhantomData,
        }
    }
}

impl<K, V, F, S> ComposedCache<K, V, F, S> {
    /// Chains `first` in front of `second`, writing back every value found in `second`.
    #[must_use]
    pub fn new(first: F, second: S) -> Self {
        Self {
            first: Arc::new(first),
            second: Arc::new(second),
            policy: WriteBackPolicy::always(),
            _key: PhantomData,
        }
    }

    /// Replaces the write-back policy.
    #[must_use]
    pub fn with_write_back(mut self, policy: WriteBackPolicy<V>) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the cache consulted first.
    #[must_use]
    pub fn first(&self) -> &F {
        &self.first
    }

    /// Returns the cache consulted on a miss in the first one.
    #[must_use]
    pub fn second(&self) -> &S {
        &self.second
    }
}

impl<K, V, F, S> ComposedCache<K, V, F, S>
where
    K: CacheKey + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    F: Cache<K, V> + 'static,
    S: Cache<K, V> + 'static,
{
    fn get_from_second(&self, key: &K, completer: Completer<Option<V>>) {
        if completer.is_cancelled() {
            return;
        }

        let fetch = self.second.get(key);
        forward_cancel(&completer, &fetch);

        let this = self.clone();
        let key = key.clone();
        fetch.on_complete(move |outcome| {
            match outcome {
                Outcome::Completed(Some(value)) => {
                    telemetry::record(Operation::Get, CacheActivity::SecondHit);
                    this.write_back(&key, value);
                }
                Outcome::Completed(None) => telemetry::record(Operation::Get, CacheActivity::Miss),
                Outcome::Failed(_) | Outcome::Cancelled => {}
            }
            completer.settle(outcome.clone());
        });
    }

    fn write_back(&self, key: &K, value: &V) {
        if !self.policy.should_write_back(value) {
            return;
        }

        telemetry::record(Operation::Set, CacheActivity::WriteBack);
        self.first.set(key, value.clone()).on_complete(|outcome| {
            if let Outcome::Failed(error) = outcome {
                telemetry::record_failure(Operation::Set, CacheActivity::WriteBackFailed, error);
            }
        });
    }
}

/// Cancels `branch` when the composed result owned by `completer` is cancelled.
fn forward_cancel<T, U: Send + Sync + 'static>(completer: &Completer<T>, branch: &AsyncResult<U>) {
    let branch = branch.clone();
    completer.on_cancel(move || {
        branch.cancel();
    });
}

impl<K, V, F, S> Cache<K, V> for ComposedCache<K, V, F, S>
where
    K: CacheKey + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    F: Cache<K, V> + 'static,
    S: Cache<K, V> + 'static,
{
    fn get(&self, key: &K) -> AsyncResult<Option<V>> {
        if let Some(rejected) = reject_unset(key) {
            return rejected;
        }

        let (completer, result) = AsyncResult::pending();
        let lookup = self.first.get(key);
        forward_cancel(&completer, &lookup);

        let this = self.clone();
        let key = key.clone();
        lookup.on_complete(move |outcome| match outcome {
            Outcome::Completed(Some(value)) => {
                telemetry::record(Operation::Get, CacheActivity::FirstHit);
                completer.complete(Some(value.clone()));
            }
            Outcome::Completed(None) => this.get_from_second(&key, completer),
            Outcome::Failed(error) => {
                completer.fail(error.clone());
            }
            Outcome::Cancelled => {
                completer.settle(Outcome::Cancelled);
            }
        });

        result
    }

    fn set(&self, key: &K, value: V) -> AsyncResult<()> {
        if let Some(rejected) = reject_unset(key) {
            return rejected;
        }

        fan_out(Operation::Set, self.first.set(key, value.clone()), self.second.set(key, value))
    }

    fn evict(&self, key: &K) -> AsyncResult<()> {
        if let Some(rejected) = reject_unset(key) {
            return rejected;
        }

        fan_out(Operation::Evict, self.first.evict(key), self.second.evict(key))
    }
}
