// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! [`Spawner`] for plugging in the worker pool that runs cache operations.

use std::fmt::Debug;
use std::pin::Pin;
use std::sync::Arc;

/// A type-erased unit of work handed to a custom spawn function.
pub type BoxedFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

type SpawnFn = dyn Fn(BoxedFuture) + Send + Sync;

/// Runtime-agnostic task spawner.
///
/// Cache implementations hold a `Spawner` and use it to schedule each operation on a shared
/// worker pool, so callers never block while an operation is dispatched. Work is always
/// spawned detached; the [`AsyncResult`](crate::AsyncResult) returned by the cache tracks it.
///
/// # Examples
///
/// Using Tokio:
///
/// ```rust
/// use stratum_tier::{AsyncResult, Spawner};
///
/// # #[tokio::main]
/// # async fn main() {
/// let spawner = Spawner::new_tokio();
/// let value = AsyncResult::spawn(&spawner, async { Ok(1 + 1) }).await.unwrap();
/// assert_eq!(value, 2);
/// # }
/// ```
///
/// ## Custom Runtime
///
/// ```rust
/// use stratum_tier::Spawner;
///
/// let spawner = Spawner::new_custom(|work| {
///     std::thread::spawn(move || futures::executor::block_on(work));
/// });
/// ```
#[derive(Debug, Clone)]
pub struct Spawner(SpawnerKind);

#[derive(Clone)]
enum SpawnerKind {
    #[cfg(feature = "tokio")]
    Tokio(tokio::runtime::Handle),
    Custom(Arc<SpawnFn>),
}

impl Debug for SpawnerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(feature = "tokio")]
            Self::Tokio(_) => f.write_str("Tokio"),
            Self::Custom(_) => f.write_str("Custom"),
        }
    }
}

impl Spawner {
    /// Creates a spawner for the Tokio runtime the caller is running in.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    #[must_use]
    #[cfg(feature = "tokio")]
    #[cfg_attr(docsrs, doc(cfg(feature = "tokio")))]
    pub fn new_tokio() -> Self {
        Self::from_handle(tokio::runtime::Handle::current())
    }

    /// Creates a spawner for a specific Tokio runtime.
    ///
    /// Unlike [`new_tokio`](Self::new_tokio), the spawner can then be used from any thread.
    #[must_use]
    #[cfg(feature = "tokio")]
    #[cfg_attr(docsrs, doc(cfg(feature = "tokio")))]
    pub fn from_handle(handle: tokio::runtime::Handle) -> Self {
        Self(SpawnerKind::Tokio(handle))
    }

    /// Creates a custom spawner from a closure.
    ///
    /// The closure receives a boxed, pinned future and is responsible for
    /// driving it to completion on the appropriate runtime.
    pub fn new_custom<F>(f: F) -> Self
    where
        F: Fn(BoxedFuture) + Send + Sync + 'static,
    {
        Self(SpawnerKind::Custom(Arc::new(f)))
    }

    /// Creates a spawner that runs every task on a dedicated OS thread.
    ///
    /// Useful for work that blocks instead of yielding.
    #[must_use]
    pub fn new_thread_per_task() -> Self {
        Self::new_custom(|work| {
            std::thread::spawn(move || futures::executor::block_on(work));
        })
    }

    /// Spawns `work` detached.
    pub fn spawn(&self, work: impl Future<Output = ()> + Send + 'static) {
        match &self.0 {
            #[cfg(feature = "tokio")]
            SpawnerKind::Tokio(handle) => drop(handle.spawn(work)),
            SpawnerKind::Custom(spawn) => spawn(Box::pin(work)),
        }
    }
}
