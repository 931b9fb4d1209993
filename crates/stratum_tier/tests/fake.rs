// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Tests for `FakeCache` and the `AsyncResult` it hands out.

use std::error::Error as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use stratum_tier::testing::{CacheOp, FakeCache, InjectedFailure, Latency};
use stratum_tier::{Cache, Operation, Spawner};

fn key(k: &str) -> String {
    k.to_string()
}

#[tokio::test]
async fn records_invocations_and_completions() {
    let cache = FakeCache::<String, i32>::new(Spawner::new_tokio());

    cache.set(&key("a"), 1).await.unwrap();
    assert_eq!(cache.get(&key("a")).await.unwrap(), Some(1));
    assert_eq!(cache.get(&key("missing")).await.unwrap(), None);
    cache.evict(&key("a")).await.unwrap();

    let expected = vec![
        CacheOp::Set { key: key("a"), value: 1 },
        CacheOp::Get(key("a")),
        CacheOp::Get(key("missing")),
        CacheOp::Evict(key("a")),
    ];
    assert_eq!(cache.operations(), expected);
    assert_eq!(cache.completions(), expected);

    cache.clear_operations();
    assert!(cache.operations().is_empty());
    assert!(cache.completions().is_empty());
}

#[tokio::test]
async fn injected_failure_is_the_cause() {
    let cache = FakeCache::<String, i32>::new(Spawner::new_tokio());
    cache.seed(key("a"), 1);
    cache.fail_when(|op| matches!(op, CacheOp::Evict(_)));

    let error = cache.evict(&key("a")).await.unwrap_err();
    let cause = error.source().and_then(|e| e.downcast_ref::<InjectedFailure>()).unwrap();
    assert_eq!(cause.operation(), Operation::Evict);
    assert_eq!(error.to_string(), "fake: evict failed");

    // Data is untouched, the failed call still counts as completed.
    assert_eq!(cache.peek(&key("a")), Some(1));
    assert_eq!(cache.completions(), vec![CacheOp::Evict(key("a"))]);

    cache.clear_failures();
    cache.evict(&key("a")).await.unwrap();
    assert!(!cache.contains_key(&key("a")));
}

#[tokio::test]
async fn capacity_evicts_least_recently_used() {
    let cache = FakeCache::<String, i32>::with_capacity(Spawner::new_tokio(), 2);

    cache.set(&key("a"), 1).await.unwrap();
    cache.set(&key("b"), 2).await.unwrap();
    assert_eq!(cache.get(&key("a")).await.unwrap(), Some(1));
    cache.set(&key("c"), 3).await.unwrap();

    assert_eq!(cache.entry_count(), 2);
    assert!(cache.contains_key(&key("a")));
    assert!(!cache.contains_key(&key("b")));
    assert!(cache.contains_key(&key("c")));
}

#[tokio::test]
async fn cooperative_latency_stops_on_cancel() {
    let cache = FakeCache::<String, i32>::new(Spawner::new_tokio());
    cache.set_latency(Latency::Cooperative(Duration::from_millis(200)));

    let pending = cache.set(&key("a"), 1);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(pending.cancel());
    assert!(pending.is_cancelled());

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(cache.operations().len(), 1);
    assert!(cache.completions().is_empty());
    assert!(!cache.contains_key(&key("a")));
}

#[test]
fn blocking_latency_runs_to_the_end_after_cancel() {
    let cache = FakeCache::<String, i32>::new(Spawner::new_thread_per_task());
    cache.set_latency(Latency::Blocking(Duration::from_millis(100)));

    let started = Instant::now();
    let pending = cache.set(&key("a"), 1);
    std::thread::sleep(Duration::from_millis(20));
    pending.cancel();
    assert!(pending.join().unwrap_err().is_cancelled());
    assert!(started.elapsed() < Duration::from_millis(100));

    std::thread::sleep(Duration::from_millis(250));
    assert_eq!(cache.completions().len(), 1);
    assert_eq!(cache.peek(&key("a")), Some(1));
}

#[test]
fn cooperative_latency_needs_a_tokio_spawner() {
    let cache = FakeCache::<String, i32>::new(Spawner::new_thread_per_task());
    cache.set_latency(Latency::Cooperative(Duration::from_millis(10)));

    // Without a Tokio timer the worker panics and the operation is abandoned.
    let error = cache.get(&key("k")).join().unwrap_err();
    assert!(!error.is_cancelled());
    assert!(error.to_string().contains("abandoned"));
    assert!(cache.completions().is_empty());
}

#[test]
fn operations_run_off_the_calling_thread() {
    let cache = FakeCache::<String, i32>::new(Spawner::new_thread_per_task());
    cache.set_latency(Latency::Blocking(Duration::from_millis(100)));

    let started = Instant::now();
    let pending = cache.get(&key("a"));
    assert!(started.elapsed() < Duration::from_millis(100));
    assert!(!pending.is_finished());

    assert_eq!(pending.join().unwrap(), None);
    assert!(started.elapsed() >= Duration::from_millis(100));

    cache.clear_latency();
    assert_eq!(cache.get(&key("a")).join().unwrap(), None);
}

#[test]
fn on_success_fires_only_for_completed_operations() {
    let cache = FakeCache::<String, i32>::new(Spawner::new_thread_per_task());
    let calls = Arc::new(AtomicUsize::new(0));

    let ok = cache.set(&key("a"), 1);
    let counter = Arc::clone(&calls);
    ok.on_success(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    ok.join().unwrap();

    cache.fail_when(|_| true);
    let failed = cache.set(&key("b"), 2);
    let counter = Arc::clone(&calls);
    failed.on_success(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    failed.join().unwrap_err();

    // Registered after completion: runs right away.
    let counter = Arc::clone(&calls);
    ok.on_success(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
