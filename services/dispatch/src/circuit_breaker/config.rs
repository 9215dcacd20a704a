//! Circuit breaker tuning parameters.

use rust_common::PlatformError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tuning parameters for the circuit breakers of one tenant.
///
/// A tenant without an explicit config uses the manager's default. All
/// durations must be positive, thresholds are percentages in `[0, 100]`,
/// and count thresholds must be at least 1; see [`Self::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// How often sampling is expected to run. Informational; the actual
    /// cadence is driven by the caller.
    pub sample_rate: Duration,
    /// Cooldown an endpoint spends open before a retry probe is allowed.
    pub error_timeout: Duration,
    /// Failure percentage within the observation window that opens the
    /// breaker.
    pub failure_threshold: u32,
    /// Success percentage within the observation window that closes a
    /// half-open breaker.
    pub success_threshold: u32,
    /// Minimum attempts observed in the window before percentage
    /// thresholds are evaluated.
    pub minimum_request_count: u64,
    /// Number of consecutive failed samples that force-opens a breaker
    /// regardless of percentage thresholds.
    pub consecutive_failure_threshold: u64,
    /// Trailing duration over which attempt statistics are aggregated.
    pub observability_window: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            sample_rate: Duration::from_secs(30),
            error_timeout: Duration::from_secs(30),
            failure_threshold: 70,
            success_threshold: 90,
            minimum_request_count: 10,
            consecutive_failure_threshold: 10,
            observability_window: Duration::from_secs(300),
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a config with a custom error timeout.
    #[must_use]
    pub const fn with_error_timeout(mut self, timeout: Duration) -> Self {
        self.error_timeout = timeout;
        self
    }

    /// Create a config with a custom failure threshold percentage.
    #[must_use]
    pub const fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Create a config with a custom success threshold percentage.
    #[must_use]
    pub const fn with_success_threshold(mut self, threshold: u32) -> Self {
        self.success_threshold = threshold;
        self
    }

    /// Create a config with a custom minimum request count.
    #[must_use]
    pub const fn with_minimum_request_count(mut self, count: u64) -> Self {
        self.minimum_request_count = count;
        self
    }

    /// Create a config with a custom consecutive failure threshold.
    #[must_use]
    pub const fn with_consecutive_failure_threshold(mut self, threshold: u64) -> Self {
        self.consecutive_failure_threshold = threshold;
        self
    }

    /// Create a config with a custom observation window.
    #[must_use]
    pub const fn with_observability_window(mut self, window: Duration) -> Self {
        self.observability_window = window;
        self
    }

    /// Validate the config against its invariants.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::InvalidInput`] naming the offending field.
    pub fn validate(&self) -> Result<(), PlatformError> {
        if self.sample_rate.is_zero() {
            return Err(PlatformError::invalid_input(
                "sample_rate must be greater than zero",
            ));
        }
        if self.error_timeout.is_zero() {
            return Err(PlatformError::invalid_input(
                "error_timeout must be greater than zero",
            ));
        }
        if self.observability_window.is_zero() {
            return Err(PlatformError::invalid_input(
                "observability_window must be greater than zero",
            ));
        }
        if self.failure_threshold > 100 {
            return Err(PlatformError::invalid_input(
                "failure_threshold must be between 0 and 100",
            ));
        }
        if self.success_threshold > 100 {
            return Err(PlatformError::invalid_input(
                "success_threshold must be between 0 and 100",
            ));
        }
        if self.minimum_request_count == 0 {
            return Err(PlatformError::invalid_input(
                "minimum_request_count must be at least 1",
            ));
        }
        if self.consecutive_failure_threshold == 0 {
            return Err(PlatformError::invalid_input(
                "consecutive_failure_threshold must be at least 1",
            ));
        }
        Ok(())
    }
}
