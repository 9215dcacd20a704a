//! Single-process breaker store.
//!
//! Honors the same contract as the distributed backing, for tests and
//! non-clustered deployments.

use async_trait::async_trait;
use rust_common::PlatformError;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::BreakerStore;
use crate::circuit_breaker::breaker::CircuitBreaker;

/// In-memory [`BreakerStore`] backed by a hash map.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<HashMap<String, CircuitBreaker>>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of breaker records currently held.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl BreakerStore for InMemoryStore {
    async fn get(&self, endpoint_id: &str) -> Result<Option<CircuitBreaker>, PlatformError> {
        Ok(self.records.read().await.get(endpoint_id).cloned())
    }

    async fn create_if_absent(&self, breaker: &CircuitBreaker) -> Result<(), PlatformError> {
        self.records
            .write()
            .await
            .entry(breaker.endpoint_id.clone())
            .or_insert_with(|| breaker.clone());
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        expected_version: u64,
        breaker: &CircuitBreaker,
    ) -> Result<(), PlatformError> {
        let mut records = self.records.write().await;
        match records.get_mut(&breaker.endpoint_id) {
            Some(existing) if existing.version == expected_version => {
                *existing = breaker.clone();
                Ok(())
            }
            Some(_) => Err(PlatformError::conflict(&breaker.endpoint_id)),
            None => Err(PlatformError::NotFound(breaker.endpoint_id.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn record(endpoint: &str) -> CircuitBreaker {
        CircuitBreaker::new(endpoint, "project-1", DateTime::UNIX_EPOCH)
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let store = InMemoryStore::new();
        assert!(store.get("ep-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_if_absent_keeps_first_writer() {
        let store = InMemoryStore::new();
        let first = record("ep-1");
        let mut second = record("ep-1");
        second.tenant_id = "project-2".to_string();

        store.create_if_absent(&first).await.unwrap();
        store.create_if_absent(&second).await.unwrap();

        let stored = store.get("ep-1").await.unwrap().unwrap();
        assert_eq!(stored.tenant_id, "project-1");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_cas_replaces_matching_version() {
        let store = InMemoryStore::new();
        store.create_if_absent(&record("ep-1")).await.unwrap();

        let mut updated = record("ep-1");
        updated.version = 1;
        updated.failure_count = 7;

        store.compare_and_swap(0, &updated).await.unwrap();

        let stored = store.get("ep-1").await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.failure_count, 7);
    }

    #[tokio::test]
    async fn test_cas_rejects_stale_version() {
        let store = InMemoryStore::new();
        store.create_if_absent(&record("ep-1")).await.unwrap();

        let mut updated = record("ep-1");
        updated.version = 1;
        store.compare_and_swap(0, &updated).await.unwrap();

        // A second writer still holding version 0 must lose
        let mut stale = record("ep-1");
        stale.version = 1;
        let result = store.compare_and_swap(0, &stale).await;

        assert!(matches!(result, Err(PlatformError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_cas_on_missing_record() {
        let store = InMemoryStore::new();
        let result = store.compare_and_swap(0, &record("ep-1")).await;
        assert!(matches!(result, Err(PlatformError::NotFound(_))));
    }
}
