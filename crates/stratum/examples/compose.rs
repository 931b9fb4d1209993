// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Two-level pipeline: a small, fast cache in front of a larger one.
//! Values found only in the larger cache are written back to the small one.

use stratum::{Cache, CacheExt, InMemoryCache, Spawner};

#[tokio::main]
async fn main() {
    let spawner = Spawner::new_tokio();

    let l1 = InMemoryCache::<String, String>::builder(spawner.clone())
        .name("l1")
        .max_capacity(1_000)
        .build();
    let l2 = InMemoryCache::<String, String>::builder(spawner).name("l2").build();

    // Keep a handle on L2 to populate it behind the pipeline's back.
    let cache = l1.clone().compose(l2.clone());
    let key = "user:1".to_string();

    l2.set(&key, "Alice".to_string()).await.expect("set failed");

    // Miss in L1, hit in L2; the value is written back to L1.
    let value = cache.get(&key).await.expect("get failed");
    println!("get({key}): {value:?}");

    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    println!("l1 after write-back: {:?}", l1.get(&key).await.expect("get failed"));

    // Evictions reach both caches.
    cache.evict(&key).await.expect("evict failed");
    println!("after evict: {:?}", cache.get(&key).await.expect("get failed"));
}
