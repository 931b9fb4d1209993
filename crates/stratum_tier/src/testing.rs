// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Fake cache implementation for testing.
//!
//! This module provides `FakeCache`, a configurable in-memory cache that
//! records all operations and supports failure and latency injection for
//! testing pipelines built on top of the [`Cache`] capability.

use std::{fmt, sync::Arc, time::Duration};

use parking_lot::Mutex;

use crate::key::reject_unset;
use crate::{AsyncResult, Cache, CacheKey, Error, Operation, Spawner};

/// Recorded cache operation with full context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOp<K, V> {
    /// A get operation was performed with the given key.
    Get(K),
    /// A set operation was performed with the given key and value.
    Set {
        /// The key that was set.
        key: K,
        /// The value that was stored.
        value: V,
    },
    /// An evict operation was performed with the given key.
    Evict(K),
}

impl<K, V> CacheOp<K, V> {
    /// Returns the kind of operation.
    #[must_use]
    pub fn operation(&self) -> Operation {
        match self {
            Self::Get(_) => Operation::Get,
            Self::Set { .. } => Operation::Set,
            Self::Evict(_) => Operation::Evict,
        }
    }

    /// Returns the key the operation targeted.
    #[must_use]
    pub fn key(&self) -> &K {
        match self {
            Self::Get(key) | Self::Set { key, .. } | Self::Evict(key) => key,
        }
    }
}

/// Simulated time an operation takes before it touches the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Latency {
    /// Waits on the Tokio timer. Cancellation stops the operation during the wait.
    ///
    /// # Panics
    ///
    /// The wait needs a Tokio timer, so the cache must run on a Tokio-backed [`Spawner`]. On any
    /// other spawner the operation panics and its result fails as abandoned.
    Cooperative(Duration),
    /// Sleeps the worker thread. Cancellation cannot interrupt the wait.
    Blocking(Duration),
}

impl Latency {
    async fn elapse(self) {
        match self {
            Self::Cooperative(duration) => tokio::time::sleep(duration).await,
            Self::Blocking(duration) => std::thread::sleep(duration),
        }
    }
}

/// The native error a [`FakeCache`] reports for injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectedFailure {
    operation: Operation,
}

impl InjectedFailure {
    /// Returns the operation that was made to fail.
    #[must_use]
    pub fn operation(&self) -> Operation {
        self.operation
    }
}

impl fmt::Display for InjectedFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fake: {} failed", self.operation)
    }
}

impl std::error::Error for InjectedFailure {}

type FailPredicate<K, V> = Box<dyn Fn(&CacheOp<K, V>) -> bool + Send + Sync>;

/// Entries ordered from least to most recently used.
struct Entries<K, V> {
    items: Vec<(K, V)>,
    capacity: Option<usize>,
}

impl<K: Eq, V: Clone> Entries<K, V> {
    fn position(&self, key: &K) -> Option<usize> {
        self.items.iter().position(|(k, _)| k == key)
    }

    fn touch(&mut self, key: &K) -> Option<V> {
        let index = self.position(key)?;
        let item = self.items.remove(index);
        let value = item.1.clone();
        self.items.push(item);
        Some(value)
    }

    fn peek(&self, key: &K) -> Option<V> {
        self.position(key).map(|index| self.items[index].1.clone())
    }

    fn insert(&mut self, key: K, value: V) {
        if let Some(index) = self.position(&key) {
            self.items.remove(index);
        }
        self.items.push((key, value));
        if let Some(capacity) = self.capacity {
            while self.items.len() > capacity {
                self.items.remove(0);
            }
        }
    }

    fn remove(&mut self, key: &K) {
        if let Some(index) = self.position(key) {
            self.items.remove(index);
        }
    }
}

struct Inner<K, V> {
    entries: Mutex<Entries<K, V>>,
    operations: Mutex<Vec<CacheOp<K, V>>>,
    completions: Mutex<Vec<CacheOp<K, V>>>,
    fail_when: Mutex<Option<FailPredicate<K, V>>>,
    latency: Mutex<Option<Latency>>,
}

/// A configurable fake cache for testing.
///
/// This cache stores values in memory and runs every operation on the provided
/// [`Spawner`]. Invocations are recorded synchronously when an operation is called
/// ([`operations`](Self::operations)); operations that ran to the end are recorded again
/// once they finish ([`completions`](Self::completions)), whether they succeeded or failed.
///
/// An optional capacity turns the fake into a least-recently-used cache.
///
/// # Examples
///
/// ```no_run
/// use stratum_tier::{Cache, Spawner, testing::{CacheOp, FakeCache}};
///
/// # async fn example() {
/// let cache = FakeCache::<String, i32>::new(Spawner::new_tokio());
///
/// cache.set(&"key".to_string(), 42).await.unwrap();
/// assert_eq!(cache.get(&"key".to_string()).await.unwrap(), Some(42));
///
/// assert_eq!(cache.operations(), vec![
///     CacheOp::Set { key: "key".to_string(), value: 42 },
///     CacheOp::Get("key".to_string()),
/// ]);
/// # }
/// ```
///
/// # Failure Injection
///
/// ```no_run
/// use stratum_tier::{Cache, Spawner, testing::{CacheOp, FakeCache}};
///
/// # async fn example() {
/// let cache = FakeCache::<String, i32>::new(Spawner::new_tokio());
///
/// cache.fail_when(|op| matches!(op, CacheOp::Evict(k) if k == "pinned"));
/// assert!(cache.evict(&"pinned".to_string()).await.is_err());
/// assert!(cache.evict(&"other".to_string()).await.is_ok());
/// # }
/// ```
pub struct FakeCache<K, V> {
    inner: Arc<Inner<K, V>>,
    spawner: Spawner,
}

impl<K, V> fmt::Debug for FakeCache<K, V>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeCache")
            .field("entries", &self.inner.entries.lock().items)
            .field("operations", &self.inner.operations)
            .field("fail_when", &self.inner.fail_when.lock().is_some())
            .field("latency", &self.inner.latency)
            .finish()
    }
}

impl<K, V> Clone for FakeCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            spawner: self.spawner.clone(),
        }
    }
}

impl<K, V> FakeCache<K, V> {
    /// Creates a new, unbounded, empty fake cache.
    #[must_use]
    pub fn new(spawner: Spawner) -> Self {
        Self::build(spawner, None)
    }

    /// Creates a fake cache holding at most `capacity` entries.
    ///
    /// Writing to a full cache evicts the least recently used entry.
    #[must_use]
    pub fn with_capacity(spawner: Spawner, capacity: usize) -> Self {
        Self::build(spawner, Some(capacity))
    }

    fn build(spawner: Spawner, capacity: Option<usize>) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(Entries {
                    items: Vec::new(),
                    capacity,
                }),
                operations: Mutex::new(Vec::new()),
                completions: Mutex::new(Vec::new()),
                fail_when: Mutex::new(None),
                latency: Mutex::new(None),
            }),
            spawner,
        }
    }

    /// Sets a predicate that determines which operations fail.
    ///
    /// A failing operation still waits out the configured latency and is recorded as completed,
    /// but leaves the data untouched and reports an [`InjectedFailure`].
    ///
    /// # Examples
    ///
    /// ```
    /// use stratum_tier::{Spawner, testing::{CacheOp, FakeCache}};
    ///
    /// let cache: FakeCache<String, i32> = FakeCache::new(Spawner::new_thread_per_task());
    ///
    /// // Fail all operations
    /// cache.fail_when(|_| true);
    ///
    /// // Fail only gets
    /// cache.fail_when(|op| matches!(op, CacheOp::Get(_)));
    /// ```
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&CacheOp<K, V>) -> bool + Send + Sync + 'static,
    {
        *self.inner.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Clears the failure predicate, allowing all operations to succeed.
    pub fn clear_failures(&self) {
        *self.inner.fail_when.lock() = None;
    }

    /// Makes every subsequent operation take `latency` before touching the data.
    pub fn set_latency(&self, latency: Latency) {
        *self.inner.latency.lock() = Some(latency);
    }

    /// Removes any configured latency.
    pub fn clear_latency(&self) {
        *self.inner.latency.lock() = None;
    }
}

impl<K, V> FakeCache<K, V>
where
    K: Clone + Eq,
    V: Clone,
{
    /// Stores a value directly, without recording an operation.
    pub fn seed(&self, key: K, value: V) {
        self.inner.entries.lock().insert(key, value);
    }

    /// Returns the stored value without recording an operation or refreshing its recency.
    #[must_use]
    pub fn peek(&self, key: &K) -> Option<V> {
        self.inner.entries.lock().peek(key)
    }

    /// Returns true if the cache contains the given key.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.entries.lock().position(key).is_some()
    }

    /// Returns the number of entries in the cache.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.inner.entries.lock().items.len()
    }

    /// Returns a clone of all operations invoked so far, in call order.
    #[must_use]
    pub fn operations(&self) -> Vec<CacheOp<K, V>> {
        self.inner.operations.lock().clone()
    }

    /// Returns a clone of all operations that ran to the end, in completion order.
    #[must_use]
    pub fn completions(&self) -> Vec<CacheOp<K, V>> {
        self.inner.completions.lock().clone()
    }

    /// Clears all recorded operations and completions.
    pub fn clear_operations(&self) {
        self.inner.operations.lock().clear();
        self.inner.completions.lock().clear();
    }
}

impl<K, V> Inner<K, V>
where
    K: Eq,
    V: Clone,
{
    fn should_fail(&self, op: &CacheOp<K, V>) -> bool {
        self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(op))
    }

    async fn perform<T>(&self, op: CacheOp<K, V>, apply: impl FnOnce(&mut Entries<K, V>) -> T) -> Result<T, Error> {
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            latency.elapse().await;
        }

        let result = if self.should_fail(&op) {
            Err(Error::caused_by(InjectedFailure {
                operation: op.operation(),
            }))
        } else {
            Ok(apply(&mut self.entries.lock()))
        };

        self.completions.lock().push(op);
        result
    }
}

impl<K, V> FakeCache<K, V>
where
    K: Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn record(&self, op: CacheOp<K, V>) -> (Arc<Inner<K, V>>, CacheOp<K, V>) {
        self.inner.operations.lock().push(op.clone());
        (Arc::clone(&self.inner), op)
    }
}

impl<K, V> Cache<K, V> for FakeCache<K, V>
where
    K: CacheKey + Clone + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, key: &K) -> AsyncResult<Option<V>> {
        if let Some(rejected) = reject_unset(key) {
            return rejected;
        }

        let (inner, op) = self.record(CacheOp::Get(key.clone()));
        let key = key.clone();
        AsyncResult::spawn(&self.spawner, async move { inner.perform(op, |entries| entries.touch(&key)).await })
    }

    fn set(&self, key: &K, value: V) -> AsyncResult<()> {
        if let Some(rejected) = reject_unset(key) {
            return rejected;
        }

        let (inner, op) = self.record(CacheOp::Set {
            key: key.clone(),
            value: value.clone(),
        });
        let key = key.clone();
        AsyncResult::spawn(&self.spawner, async move {
            inner.perform(op, |entries| entries.insert(key, value)).await
        })
    }

    fn evict(&self, key: &K) -> AsyncResult<()> {
        if let Some(rejected) = reject_unset(key) {
            return rejected;
        }

        let (inner, op) = self.record(CacheOp::Evict(key.clone()));
        let key = key.clone();
        AsyncResult::spawn(&self.spawner, async move { inner.perform(op, |entries| entries.remove(&key)).await })
    }
}
