// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for `InMemoryCache`.

use std::time::Duration;

use stratum_memory::{InMemoryCache, InMemoryCacheBuilder};
use stratum_tier::{Cache, Spawner};

fn key(k: &str) -> String {
    k.to_string()
}

#[tokio::test]
async fn empty_cache_returns_none() {
    let cache = InMemoryCache::<String, i32>::new(Spawner::new_tokio());

    assert_eq!(cache.get(&key("missing")).await.unwrap(), None);
    assert_eq!(cache.entry_count(), 0);
}

#[tokio::test]
async fn set_then_get_returns_value() {
    let cache = InMemoryCache::<String, i32>::new(Spawner::new_tokio());

    cache.set(&key("k"), 42).await.unwrap();
    assert_eq!(cache.get(&key("k")).await.unwrap(), Some(42));

    cache.set(&key("k"), 43).await.unwrap();
    assert_eq!(cache.get(&key("k")).await.unwrap(), Some(43));
}

#[tokio::test]
async fn evict_then_get_returns_none() {
    let cache = InMemoryCache::<String, i32>::new(Spawner::new_tokio());

    cache.set(&key("k"), 42).await.unwrap();
    cache.evict(&key("k")).await.unwrap();
    assert_eq!(cache.get(&key("k")).await.unwrap(), None);

    // Evicting an absent key is not an error.
    cache.evict(&key("never-set")).await.unwrap();
}

#[tokio::test]
async fn unset_key_is_rejected() {
    let cache = InMemoryCache::<String, i32>::new(Spawner::new_tokio());

    let pending = cache.get(&String::new());
    assert!(pending.is_finished());
    assert!(pending.await.unwrap_err().is_invalid_argument());
    assert!(cache.set(&String::new(), 1).await.unwrap_err().is_invalid_argument());
    assert!(cache.evict(&String::new()).await.unwrap_err().is_invalid_argument());
}

#[tokio::test]
async fn time_to_live_expires_entries() {
    let cache = InMemoryCacheBuilder::<String, i32>::new(Spawner::new_tokio())
        .time_to_live(Duration::from_millis(50))
        .build();

    cache.set(&key("k"), 1).await.unwrap();
    assert_eq!(cache.get(&key("k")).await.unwrap(), Some(1));

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(cache.get(&key("k")).await.unwrap(), None);
}

#[test]
fn blocking_callers_on_custom_spawner() {
    let cache = InMemoryCache::<u64, String>::with_capacity(Spawner::new_thread_per_task(), 100);

    cache.set(&7, "seven".to_string()).join().unwrap();
    assert_eq!(cache.get(&7).join().unwrap(), Some("seven".to_string()));
}
