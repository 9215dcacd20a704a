//! Shared breaker state store.
//!
//! Breaker records are the only cross-process mutable state in the
//! dispatch service. The store contract is deliberately small: point
//! reads, create-if-absent, and a versioned compare-and-swap that refuses
//! to overwrite a record another writer has already advanced.

use async_trait::async_trait;
use rust_common::PlatformError;

use super::breaker::CircuitBreaker;

mod memory;
mod redis;

pub use memory::InMemoryStore;
pub use redis::RedisStore;

/// Durable, shared key-value store for breaker records.
///
/// Implementations must be safe for concurrent use from many manager
/// instances; two writers racing on the same endpoint must never both
/// succeed with the same expected version.
#[async_trait]
pub trait BreakerStore: Send + Sync {
    /// Fetch the breaker record for an endpoint, if one exists.
    async fn get(&self, endpoint_id: &str) -> Result<Option<CircuitBreaker>, PlatformError>;

    /// Store an initial record unless one already exists. Losing the
    /// creation race is not an error.
    async fn create_if_absent(&self, breaker: &CircuitBreaker) -> Result<(), PlatformError>;

    /// Replace the record for `breaker.endpoint_id`, but only if the
    /// stored version still equals `expected_version`.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Conflict`] when another writer advanced
    /// the record first, and [`PlatformError::NotFound`] when no record
    /// exists for the endpoint.
    async fn compare_and_swap(
        &self,
        expected_version: u64,
        breaker: &CircuitBreaker,
    ) -> Result<(), PlatformError>;
}
