//! Error types for the dispatch service.
//!
//! Per-endpoint failures during a sampling pass are isolated and
//! aggregated rather than aborting the batch; only the loss of the
//! statistics feed (or cancellation) stops a pass outright.

use rust_common::PlatformError;
use thiserror::Error;

/// One endpoint that failed to update during a sampling pass.
#[derive(Debug)]
pub struct EndpointFailure {
    /// Endpoint whose breaker update failed.
    pub endpoint_id: String,
    /// The underlying failure. The breaker record stays at its last
    /// known-good state.
    pub error: PlatformError,
}

/// Non-exhaustive error enum for forward compatibility.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The per-tenant config source could not be read; the previously
    /// loaded table stays in effect.
    #[error("Config source unavailable: {0}")]
    ConfigSourceUnavailable(#[source] PlatformError),

    /// A fetched tenant config failed validation; the refresh is not
    /// applied.
    #[error("Invalid circuit breaker config for tenant {tenant}: {source}")]
    InvalidTenantConfig {
        /// Tenant whose config was rejected
        tenant: String,
        /// The validation failure
        #[source]
        source: PlatformError,
    },

    /// The attempt statistics source could not be polled; the sampling
    /// pass is aborted since no safe decision can be made without fresh
    /// stats.
    #[error("Statistics source unavailable: {0}")]
    StatsSourceUnavailable(#[source] PlatformError),

    /// The sampling pass was interrupted by shutdown. Already persisted
    /// endpoint updates remain valid.
    #[error("Sampling pass cancelled")]
    Cancelled,

    /// Some endpoints failed to update during the pass; the rest were
    /// processed normally.
    #[error("Sampling pass completed with {} endpoint failures", .failures.len())]
    SamplingPartial {
        /// The endpoints that failed, each left at its last known-good
        /// state
        failures: Vec<EndpointFailure>,
    },

    /// Shared state store failure outside a sampling pass.
    #[error("Store error: {0}")]
    Store(#[from] PlatformError),

    /// Internal error.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl DispatchError {
    /// Check if the failed operation is worth retrying on the next cycle.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConfigSourceUnavailable(_)
            | Self::StatsSourceUnavailable(_)
            | Self::SamplingPartial { .. } => true,
            Self::Store(source) => source.is_retryable(),
            _ => false,
        }
    }
}
