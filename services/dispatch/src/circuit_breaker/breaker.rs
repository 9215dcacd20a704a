//! Per-endpoint breaker state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::config::CircuitBreakerConfig;
use super::sources::AttemptStats;

/// Current state of an endpoint's circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation, deliveries proceed.
    Closed,
    /// Deliveries to this endpoint are suspended.
    Open,
    /// Probing recovery, a limited set of deliveries is allowed.
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Persisted breaker record for one endpoint.
///
/// The record is shared between all dispatch instances through the breaker
/// store; `version` carries the optimistic concurrency token checked by
/// the store's compare-and-swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreaker {
    /// Endpoint this breaker protects.
    pub endpoint_id: String,
    /// Tenant the endpoint belongs to, used for config resolution.
    #[serde(default)]
    pub tenant_id: String,
    /// Current state.
    pub state: CircuitState,
    /// Optimistic concurrency version, incremented on every persisted
    /// update.
    pub version: u64,
    /// Failed attempts in the current observation window.
    pub failure_count: u64,
    /// Successful attempts in the current observation window.
    pub success_count: u64,
    /// Consecutive samples that contained only failures.
    pub consecutive_failures: u64,
    /// When the breaker last changed state.
    pub last_state_change_at: DateTime<Utc>,
    /// Attempts observed since the last state change. In half-open this is
    /// the probe budget already spent.
    pub request_volume_since_last_change: u64,
}

impl CircuitBreaker {
    /// Create a fresh closed breaker for an endpoint.
    #[must_use]
    pub fn new(
        endpoint_id: impl Into<String>,
        tenant_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            endpoint_id: endpoint_id.into(),
            tenant_id: tenant_id.into(),
            state: CircuitState::Closed,
            version: 0,
            failure_count: 0,
            success_count: 0,
            consecutive_failures: 0,
            last_state_change_at: now,
            request_volume_since_last_change: 0,
        }
    }

    /// Failure percentage over the current window counters.
    #[must_use]
    pub fn failure_rate(&self) -> f64 {
        let total = self.failure_count + self.success_count;
        if total == 0 {
            0.0
        } else {
            self.failure_count as f64 / total as f64 * 100.0
        }
    }

    /// Success percentage over the current window counters.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        let total = self.failure_count + self.success_count;
        if total == 0 {
            0.0
        } else {
            self.success_count as f64 / total as f64 * 100.0
        }
    }

    /// Apply one sampling pass worth of attempt statistics and evaluate
    /// the transition rules.
    ///
    /// Window counters are replaced with the sampled values, the
    /// consecutive-failure tally is updated, and at most one transition is
    /// taken. Returns the previous state when a transition occurred.
    pub fn apply_sample(
        &mut self,
        config: &CircuitBreakerConfig,
        sample: &AttemptStats,
        now: DateTime<Utc>,
    ) -> Option<CircuitState> {
        self.failure_count = sample.failure_count;
        self.success_count = sample.success_count;
        self.request_volume_since_last_change += sample.request_volume();

        if sample.failure_count > 0 && sample.success_count == 0 {
            self.consecutive_failures += 1;
        } else if sample.success_count > 0 {
            self.consecutive_failures = 0;
        }

        let volume = sample.request_volume();
        match self.state {
            CircuitState::Closed => {
                // The consecutive-failure path is not gated on minimum
                // volume: a burst of hard failures opens the breaker even
                // with thin traffic.
                let consecutive_tripped =
                    self.consecutive_failures >= config.consecutive_failure_threshold;
                let rate_tripped = volume >= config.minimum_request_count
                    && self.failure_rate() >= f64::from(config.failure_threshold);

                if consecutive_tripped || rate_tripped {
                    return self.transition_to(CircuitState::Open, now);
                }
                None
            }
            CircuitState::Open => {
                let cooled_down = now
                    .signed_duration_since(self.last_state_change_at)
                    .to_std()
                    .map(|elapsed| elapsed >= config.error_timeout)
                    .unwrap_or(false);

                if cooled_down {
                    return self.transition_to(CircuitState::HalfOpen, now);
                }
                None
            }
            CircuitState::HalfOpen => {
                if self.consecutive_failures >= config.consecutive_failure_threshold {
                    return self.transition_to(CircuitState::Open, now);
                }
                if volume >= config.minimum_request_count {
                    if self.success_rate() >= f64::from(config.success_threshold) {
                        return self.transition_to(CircuitState::Closed, now);
                    }
                    if self.failure_rate() >= f64::from(config.failure_threshold) {
                        return self.transition_to(CircuitState::Open, now);
                    }
                }
                // Insufficient signal either way, keep probing.
                None
            }
        }
    }

    /// Whether delivery attempts may currently be sent to this endpoint.
    ///
    /// Closed breakers always allow; open breakers never do, even once the
    /// cooldown has elapsed, since the open → half-open move belongs to
    /// the sampling pass. Half-open breakers allow probes until enough
    /// volume has been observed to decide the next transition.
    #[must_use]
    pub fn is_allowed(&self, config: &CircuitBreakerConfig) -> bool {
        match self.state {
            CircuitState::Closed => true,
            CircuitState::Open => false,
            CircuitState::HalfOpen => {
                self.request_volume_since_last_change < config.minimum_request_count
            }
        }
    }

    fn transition_to(&mut self, next: CircuitState, now: DateTime<Utc>) -> Option<CircuitState> {
        let previous = self.state;
        self.state = next;
        self.failure_count = 0;
        self.success_count = 0;
        self.consecutive_failures = 0;
        self.request_volume_since_last_change = 0;
        self.last_state_change_at = now;
        Some(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use std::time::Duration;

    fn sample(failures: u64, successes: u64) -> AttemptStats {
        AttemptStats {
            tenant_id: "project-1".to_string(),
            failure_count: failures,
            success_count: successes,
        }
    }

    fn config() -> CircuitBreakerConfig {
        CircuitBreakerConfig::default()
            .with_failure_threshold(70)
            .with_success_threshold(90)
            .with_minimum_request_count(10)
            .with_consecutive_failure_threshold(3)
            .with_error_timeout(Duration::from_secs(3600))
    }

    #[test]
    fn test_new_breaker_starts_closed() {
        let breaker = CircuitBreaker::new("ep-1", "project-1", DateTime::UNIX_EPOCH);
        assert_eq!(breaker.state, CircuitState::Closed);
        assert_eq!(breaker.version, 0);
        assert!(breaker.is_allowed(&config()));
    }

    #[test]
    fn test_failure_rate_opens_breaker() {
        let mut breaker = CircuitBreaker::new("ep-1", "project-1", DateTime::UNIX_EPOCH);

        let previous = breaker.apply_sample(&config(), &sample(8, 2), DateTime::UNIX_EPOCH);

        assert_eq!(previous, Some(CircuitState::Closed));
        assert_eq!(breaker.state, CircuitState::Open);
        assert!(!breaker.is_allowed(&config()));
    }

    #[test]
    fn test_volume_gate_blocks_rate_path() {
        let mut breaker = CircuitBreaker::new("ep-1", "project-1", DateTime::UNIX_EPOCH);

        // 100% failure rate but only 2 attempts, below the minimum of 10
        let previous = breaker.apply_sample(&config(), &sample(2, 0), DateTime::UNIX_EPOCH);

        assert_eq!(previous, None);
        assert_eq!(breaker.state, CircuitState::Closed);
    }

    #[test]
    fn test_consecutive_failures_bypass_volume_gate() {
        let mut breaker = CircuitBreaker::new("ep-1", "project-1", DateTime::UNIX_EPOCH);
        let config = config();

        assert!(breaker.apply_sample(&config, &sample(1, 0), DateTime::UNIX_EPOCH).is_none());
        assert!(breaker.apply_sample(&config, &sample(1, 0), DateTime::UNIX_EPOCH).is_none());
        let previous = breaker.apply_sample(&config, &sample(1, 0), DateTime::UNIX_EPOCH);

        assert_eq!(previous, Some(CircuitState::Closed));
        assert_eq!(breaker.state, CircuitState::Open);
    }

    #[test]
    fn test_success_resets_consecutive_failures() {
        let mut breaker = CircuitBreaker::new("ep-1", "project-1", DateTime::UNIX_EPOCH);
        let config = config();

        breaker.apply_sample(&config, &sample(1, 0), DateTime::UNIX_EPOCH);
        breaker.apply_sample(&config, &sample(1, 0), DateTime::UNIX_EPOCH);
        assert_eq!(breaker.consecutive_failures, 2);

        breaker.apply_sample(&config, &sample(1, 5), DateTime::UNIX_EPOCH);
        assert_eq!(breaker.consecutive_failures, 0);
        assert_eq!(breaker.state, CircuitState::Closed);
    }

    #[test]
    fn test_open_waits_out_error_timeout() {
        let mut breaker = CircuitBreaker::new("ep-1", "project-1", DateTime::UNIX_EPOCH);
        let config = config();

        breaker.apply_sample(&config, &sample(10, 0), DateTime::UNIX_EPOCH);
        assert_eq!(breaker.state, CircuitState::Open);

        // 59 minutes: still cooling down
        let at_59m = DateTime::UNIX_EPOCH + ChronoDuration::minutes(59);
        assert!(breaker.apply_sample(&config, &sample(0, 0), at_59m).is_none());
        assert_eq!(breaker.state, CircuitState::Open);

        // 61 minutes: eligible for a probe
        let at_61m = DateTime::UNIX_EPOCH + ChronoDuration::minutes(61);
        let previous = breaker.apply_sample(&config, &sample(0, 0), at_61m);
        assert_eq!(previous, Some(CircuitState::Open));
        assert_eq!(breaker.state, CircuitState::HalfOpen);
        assert_eq!(breaker.last_state_change_at, at_61m);
    }

    #[test]
    fn test_half_open_closes_on_success_rate() {
        let mut breaker = CircuitBreaker::new("ep-1", "project-1", DateTime::UNIX_EPOCH);
        breaker.state = CircuitState::HalfOpen;

        // 19/20 successes = 95%, over the 90% success threshold
        let previous = breaker.apply_sample(&config(), &sample(1, 19), DateTime::UNIX_EPOCH);

        assert_eq!(previous, Some(CircuitState::HalfOpen));
        assert_eq!(breaker.state, CircuitState::Closed);
    }

    #[test]
    fn test_half_open_stays_on_insufficient_signal() {
        let mut breaker = CircuitBreaker::new("ep-1", "project-1", DateTime::UNIX_EPOCH);
        breaker.state = CircuitState::HalfOpen;

        // 17/20 successes = 85% < 90%, 15% failures < 70%
        let previous = breaker.apply_sample(&config(), &sample(3, 17), DateTime::UNIX_EPOCH);

        assert_eq!(previous, None);
        assert_eq!(breaker.state, CircuitState::HalfOpen);
    }

    #[test]
    fn test_half_open_reopens_on_failure_rate() {
        let mut breaker = CircuitBreaker::new("ep-1", "project-1", DateTime::UNIX_EPOCH);
        breaker.state = CircuitState::HalfOpen;

        let previous = breaker.apply_sample(&config(), &sample(15, 5), DateTime::UNIX_EPOCH);

        assert_eq!(previous, Some(CircuitState::HalfOpen));
        assert_eq!(breaker.state, CircuitState::Open);
    }

    #[test]
    fn test_half_open_below_volume_keeps_probing() {
        let mut breaker = CircuitBreaker::new("ep-1", "project-1", DateTime::UNIX_EPOCH);
        breaker.state = CircuitState::HalfOpen;

        // All failures, but below minimum volume and below the consecutive
        // threshold: stays half-open
        let previous = breaker.apply_sample(&config(), &sample(2, 0), DateTime::UNIX_EPOCH);

        assert_eq!(previous, None);
        assert_eq!(breaker.state, CircuitState::HalfOpen);
    }

    #[test]
    fn test_transition_resets_counters() {
        let mut breaker = CircuitBreaker::new("ep-1", "project-1", DateTime::UNIX_EPOCH);
        let later = DateTime::UNIX_EPOCH + ChronoDuration::seconds(30);

        breaker.apply_sample(&config(), &sample(10, 0), later);

        assert_eq!(breaker.state, CircuitState::Open);
        assert_eq!(breaker.failure_count, 0);
        assert_eq!(breaker.success_count, 0);
        assert_eq!(breaker.consecutive_failures, 0);
        assert_eq!(breaker.request_volume_since_last_change, 0);
        assert_eq!(breaker.last_state_change_at, later);
    }

    #[test]
    fn test_half_open_probe_quota() {
        let config = config();
        let mut breaker = CircuitBreaker::new("ep-1", "project-1", DateTime::UNIX_EPOCH);
        breaker.state = CircuitState::HalfOpen;

        // No probes spent yet
        assert!(breaker.is_allowed(&config));

        // Probe volume arrives but resolves nothing (85% success)
        breaker.apply_sample(&config, &sample(3, 17), DateTime::UNIX_EPOCH);
        assert_eq!(breaker.state, CircuitState::HalfOpen);

        // Quota exhausted until the next decision
        assert!(!breaker.is_allowed(&config));
    }

    #[test]
    fn test_rate_computation() {
        let mut breaker = CircuitBreaker::new("ep-1", "project-1", DateTime::UNIX_EPOCH);
        breaker.failure_count = 3;
        breaker.success_count = 1;

        assert!((breaker.failure_rate() - 75.0).abs() < f64::EPSILON);
        assert!((breaker.success_rate() - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_volume_rates_are_zero() {
        let breaker = CircuitBreaker::new("ep-1", "project-1", DateTime::UNIX_EPOCH);
        assert!(breaker.failure_rate().abs() < f64::EPSILON);
        assert!(breaker.success_rate().abs() < f64::EPSILON);
    }

    #[test]
    fn test_state_serialization_is_stable() {
        let json = serde_json::to_string(&CircuitState::HalfOpen).unwrap();
        assert_eq!(json, "\"half_open\"");
        assert_eq!(CircuitState::HalfOpen.to_string(), "half-open");
    }
}
