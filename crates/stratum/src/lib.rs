// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Composable cache pipelines.
//!
//! This crate chains independently implemented caches behind the uniform, asynchronous
//! [`Cache`] contract:
//! - Read-through lookups that fall back to the next cache and write found values back
//! - Writes and evictions fanned out to every cache in parallel, with aggregated failures
//! - Cancellation that releases waiters immediately and propagates to in-flight work
//! - Structured `tracing` events for every composed operation (feature `logs`)
//!
//! # Examples
//!
//! ## Two-Level Pipeline
//!
//! ```
//! use stratum::{Cache, CacheExt, InMemoryCache, Spawner};
//!
//! # #[tokio::main]
//! # async fn main() -> stratum::Result<()> {
//! let spawner = Spawner::new_tokio();
//! let l1 = InMemoryCache::<String, String>::builder(spawner.clone()).max_capacity(1_000).build();
//! let l2 = InMemoryCache::<String, String>::builder(spawner).build();
//!
//! let cache = l1.compose(l2);
//!
//! cache.set(&"user:1".to_string(), "Alice".to_string()).await?;
//! assert_eq!(cache.get(&"user:1".to_string()).await?, Some("Alice".to_string()));
//! # Ok(())
//! # }
//! ```
//!
//! ## Handling Fan-Out Failures
//!
//! ```
//! use std::error::Error as _;
//!
//! use stratum::{Branch, Cache, CacheExt, Spawner};
//! use stratum_tier::testing::FakeCache;
//!
//! let spawner = Spawner::new_thread_per_task();
//! let l1 = FakeCache::<String, i32>::new(spawner.clone());
//! let l2 = FakeCache::<String, i32>::new(spawner);
//! l1.fail_when(|_| true);
//!
//! let error = l1.compose(l2).evict(&"key".to_string()).join().unwrap_err();
//! assert_eq!(error.to_string(), "evict failed for firstCache");
//!
//! let failure = error.as_aggregated().unwrap();
//! assert_eq!(failure.failures()[0].branch(), Branch::First);
//! assert_eq!(error.source().unwrap().to_string(), "fake: evict failed");
//! ```

mod aggregate;
mod compose;
mod ext;
mod fan_out;
mod telemetry;
#[cfg(all(test, feature = "logs"))]
mod testing;

#[doc(inline)]
pub use compose::{ComposedCache, WriteBackPolicy};
#[doc(inline)]
pub use ext::CacheExt;
#[cfg(feature = "memory")]
#[doc(inline)]
pub use stratum_memory::{InMemoryCache, InMemoryCacheBuilder};
#[doc(inline)]
pub use stratum_tier::{
    AggregatedFailure, AsyncResult, Branch, BranchFailure, Cache, CacheKey, Completer, DynamicCache, DynamicCacheExt, Error,
    Operation, Outcome, Result, Spawner,
};
