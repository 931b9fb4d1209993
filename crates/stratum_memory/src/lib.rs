// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! In-memory cache backed by moka.
//!
//! This crate adapts moka's concurrent `TinyLFU` cache to the [`Cache`](stratum_tier::Cache)
//! capability. Use [`InMemoryCacheBuilder`] to configure capacity, TTL, and TTI without exposing
//! moka types.
//!
//! # Quick Start
//!
//! ```
//! use std::time::Duration;
//!
//! use stratum_memory::InMemoryCache;
//! use stratum_tier::{Cache, Spawner};
//!
//! let cache = InMemoryCache::<String, i32>::builder(Spawner::new_thread_per_task())
//!     .max_capacity(1000)
//!     .time_to_live(Duration::from_secs(300))
//!     .build();
//!
//! cache.set(&"key".to_string(), 42).join().unwrap();
//! assert_eq!(cache.get(&"key".to_string()).join().unwrap(), Some(42));
//!
//! cache.evict(&"key".to_string()).join().unwrap();
//! assert_eq!(cache.get(&"key".to_string()).join().unwrap(), None);
//! ```

pub mod builder;
pub mod tier;

#[doc(inline)]
pub use builder::InMemoryCacheBuilder;
#[doc(inline)]
pub use tier::InMemoryCache;
