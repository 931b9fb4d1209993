// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Core abstractions for composable cache pipelines.
//!
//! This crate defines the [`Cache`] capability that every cache exposes, the [`AsyncResult`]
//! handle its operations return, and the [`Error`] taxonomy shared by all implementations.
//!
//! # Overview
//!
//! A cache offers three operations: `get`, `set` and `evict`. Each returns immediately with an
//! [`AsyncResult`] that completes once the work ran on a worker pool described by a
//! [`Spawner`]. Callers can block on the result with [`AsyncResult::join`], `.await` it, register
//! callbacks, or cancel it.
//!
//! Third-party caches are adapted by implementing [`Cache`]; the `stratum` crate layers them into
//! pipelines.
//!
//! # Implementing a Cache
//!
//! ```
//! use std::collections::HashMap;
//! use std::sync::{Arc, Mutex};
//!
//! use stratum_tier::key::reject_unset;
//! use stratum_tier::{AsyncResult, Cache, Spawner};
//!
//! struct MapCache {
//!     map: Arc<Mutex<HashMap<String, i32>>>,
//!     spawner: Spawner,
//! }
//!
//! impl Cache<String, i32> for MapCache {
//!     fn get(&self, key: &String) -> AsyncResult<Option<i32>> {
//!         if let Some(rejected) = reject_unset(key) {
//!             return rejected;
//!         }
//!         let (map, key) = (Arc::clone(&self.map), key.clone());
//!         AsyncResult::spawn(&self.spawner, async move { Ok(map.lock().unwrap().get(&key).copied()) })
//!     }
//!
//!     fn set(&self, key: &String, value: i32) -> AsyncResult<()> {
//!         if let Some(rejected) = reject_unset(key) {
//!             return rejected;
//!         }
//!         let (map, key) = (Arc::clone(&self.map), key.clone());
//!         AsyncResult::spawn(&self.spawner, async move {
//!             map.lock().unwrap().insert(key, value);
//!             Ok(())
//!         })
//!     }
//!
//!     fn evict(&self, key: &String) -> AsyncResult<()> {
//!         if let Some(rejected) = reject_unset(key) {
//!             return rejected;
//!         }
//!         let (map, key) = (Arc::clone(&self.map), key.clone());
//!         AsyncResult::spawn(&self.spawner, async move {
//!             map.lock().unwrap().remove(&key);
//!             Ok(())
//!         })
//!     }
//! }
//!
//! let cache = MapCache {
//!     map: Arc::default(),
//!     spawner: Spawner::new_thread_per_task(),
//! };
//! cache.set(&"answer".to_string(), 42).join().unwrap();
//! assert_eq!(cache.get(&"answer".to_string()).join().unwrap(), Some(42));
//! ```
//!
//! # Testing
//!
//! Enable the `test-util` feature for [`testing::FakeCache`], which records operations and
//! supports failure and latency injection.

mod dynamic;
pub mod error;
pub mod key;
mod result;
mod spawner;
#[cfg(any(feature = "test-util", test))]
pub mod testing;
mod tier;

#[doc(inline)]
pub use dynamic::{DynamicCache, DynamicCacheExt};
#[doc(inline)]
pub use error::{AggregatedFailure, Branch, BranchFailure, Error, Operation, Result};
#[doc(inline)]
pub use key::CacheKey;
#[doc(inline)]
pub use result::{AsyncResult, Completer, Outcome};
#[doc(inline)]
pub use spawner::{BoxedFuture, Spawner};
#[doc(inline)]
pub use tier::Cache;
