//! Shared library for cross-cutting concerns in hookline Rust services.
//!
//! This crate provides centralized implementations for:
//! - Error types with retryability classification
//! - Injectable clock for deterministic time handling
//! - Retry policies with exponential backoff
//! - Tracing/logging initialization
//! - Prometheus metrics helpers

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod error;
pub mod metrics;
pub mod retry;
pub mod tracing_config;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::PlatformError;
pub use metrics::{BreakerMetrics, Counter, Gauge};
pub use retry::{RetryConfig, RetryPolicy};
pub use tracing_config::{TracingConfig, init_tracing};
