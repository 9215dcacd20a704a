//! Dispatch Service - webhook delivery fan-out with endpoint protection.
//!
//! This crate provides the delivery-side circuit breaker core for the
//! hookline platform: a per-endpoint breaker state machine driven by
//! periodic sampling of the delivery attempt log, with breaker state shared
//! across all dispatch instances through a distributed store.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod circuit_breaker;
pub mod config;
pub mod error;
pub mod sampler;
pub mod shutdown;

pub use circuit_breaker::{
    AttemptStats, AttemptStatsSource, BreakerConfigSource, BreakerStore, CircuitBreaker,
    CircuitBreakerConfig, CircuitBreakerManager, CircuitState, InMemoryStore, NotificationSink,
    NotificationType, RedisStore, SampleReport, TransitionEvent,
};
pub use config::Config;
pub use error::{DispatchError, EndpointFailure};
