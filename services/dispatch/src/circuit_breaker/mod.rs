//! Per-endpoint circuit breakers with shared distributed state.
//!
//! Delivery workers must not hammer endpoints that are currently failing.
//! Each destination endpoint gets a circuit breaker that is evaluated once
//! per sampling pass over the delivery attempt log, rather than on every
//! individual request:
//!
//! ```text
//! Closed    → Open:      failure rate or consecutive failed samples over threshold
//! Open      → Half-Open: error timeout elapsed since the breaker opened
//! Half-Open → Closed:    success rate over threshold with enough volume
//! Half-Open → Open:      failure rate over threshold with enough volume
//! ```
//!
//! Breaker state lives in a shared [`BreakerStore`] so that every dispatch
//! instance observes the same decision; concurrent writers are serialized
//! through the store's compare-and-swap contract, not in-process locks.
//! Thresholds are per-tenant and can change at runtime; the manager holds
//! them in an atomically swapped snapshot table.

mod breaker;
mod config;
mod manager;
mod notification;
mod sources;
mod store;

pub use breaker::{CircuitBreaker, CircuitState};
pub use config::CircuitBreakerConfig;
pub use manager::{CircuitBreakerManager, CircuitBreakerManagerBuilder, SampleReport};
pub use notification::{
    CallbackSink, FanoutSink, NoopSink, NotificationSink, NotificationType, TransitionEvent,
};
pub use sources::{
    AttemptStats, AttemptStatsSource, BreakerConfigSource, JsonConfigSource,
    RedisAttemptStatsSource,
};
pub use store::{BreakerStore, InMemoryStore, RedisStore};
