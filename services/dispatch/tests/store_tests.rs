//! Breaker store contract tests.
//!
//! The in-memory store must honor the same contract as the distributed
//! backing so it can stand in for it: versioned compare-and-swap, losing
//! writers surfacing conflicts, and create-if-absent keeping the first
//! writer.

use dispatch_service::circuit_breaker::{BreakerStore, CircuitBreaker, InMemoryStore};
use rust_common::PlatformError;
use std::sync::Arc;
use test_utils::fixtures;
use tokio_test::assert_ok;

fn record(endpoint: &str) -> CircuitBreaker {
    CircuitBreaker::new(endpoint, "project-1", fixtures::base_time())
}

#[tokio::test]
async fn get_returns_what_was_created() {
    let store = InMemoryStore::new();
    let breaker = record("ep-1");

    assert_ok!(store.create_if_absent(&breaker).await);

    let stored = store.get("ep-1").await.unwrap().unwrap();
    assert_eq!(stored, breaker);
}

#[tokio::test]
async fn cas_advances_version_chain() {
    let store = InMemoryStore::new();
    store.create_if_absent(&record("ep-1")).await.unwrap();

    for version in 0..5 {
        let mut updated = store.get("ep-1").await.unwrap().unwrap();
        assert_eq!(updated.version, version);
        updated.version += 1;
        updated.request_volume_since_last_change += 10;
        store.compare_and_swap(version, &updated).await.unwrap();
    }

    let stored = store.get("ep-1").await.unwrap().unwrap();
    assert_eq!(stored.version, 5);
    assert_eq!(stored.request_volume_since_last_change, 50);
}

#[tokio::test]
async fn cas_surfaces_conflict_for_stale_writer() {
    let store = InMemoryStore::new();
    store.create_if_absent(&record("ep-1")).await.unwrap();

    // Writer A wins
    let mut from_a = store.get("ep-1").await.unwrap().unwrap();
    from_a.version = 1;
    store.compare_and_swap(0, &from_a).await.unwrap();

    // Writer B still holds version 0 and must lose, not overwrite
    let mut from_b = record("ep-1");
    from_b.version = 1;
    from_b.failure_count = 99;
    let result = store.compare_and_swap(0, &from_b).await;

    assert!(matches!(result, Err(PlatformError::Conflict { .. })));
    let stored = store.get("ep-1").await.unwrap().unwrap();
    assert_eq!(stored.failure_count, 0);
}

#[tokio::test]
async fn exactly_one_concurrent_writer_wins() {
    let store = Arc::new(InMemoryStore::new());
    store.create_if_absent(&record("ep-1")).await.unwrap();

    let mut tasks = Vec::new();
    for worker in 0u64..8 {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            let mut updated = record("ep-1");
            updated.version = 1;
            updated.consecutive_failures = worker;
            store.compare_and_swap(0, &updated).await
        }));
    }

    let mut wins = 0;
    let mut conflicts = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(()) => wins += 1,
            Err(PlatformError::Conflict { .. }) => conflicts += 1,
            Err(other) => unreachable!("unexpected error: {other}"),
        }
    }

    // The store serializes the race: one winner, everyone else conflicts
    assert_eq!(wins, 1);
    assert_eq!(conflicts, 7);

    let stored = store.get("ep-1").await.unwrap().unwrap();
    assert_eq!(stored.version, 1);
}

#[tokio::test]
async fn breaker_records_round_trip_through_json() {
    // The distributed backing persists records as JSON; the exact field
    // set must survive the trip
    let mut breaker = record("ep-1");
    breaker.version = 7;
    breaker.failure_count = 3;
    breaker.success_count = 4;
    breaker.consecutive_failures = 2;
    breaker.request_volume_since_last_change = 7;

    let raw = serde_json::to_string(&breaker).unwrap();
    let parsed: CircuitBreaker = serde_json::from_str(&raw).unwrap();

    assert_eq!(parsed, breaker);
}

#[tokio::test]
async fn records_without_tenant_field_still_parse() {
    // Records persisted before tenant tracking carry no tenant_id
    let raw = serde_json::json!({
        "endpoint_id": "ep-legacy",
        "state": "closed",
        "version": 3,
        "failure_count": 0,
        "success_count": 0,
        "consecutive_failures": 0,
        "last_state_change_at": "2025-01-01T00:00:00Z",
        "request_volume_since_last_change": 0
    });

    let parsed: CircuitBreaker = serde_json::from_value(raw).unwrap();
    assert_eq!(parsed.endpoint_id, "ep-legacy");
    assert_eq!(parsed.tenant_id, "");
}
