//! Shared proptest generators for all Rust libraries.
//!
//! This module provides reusable generators for domain values used across
//! the hookline Rust libraries.

use proptest::prelude::*;
use std::time::Duration;

/// Generate valid endpoint identifiers.
pub fn endpoint_id_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9]{12,26}".prop_map(|id| format!("ep-{id}"))
}

/// Generate valid tenant/project identifiers.
pub fn tenant_id_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9]{8,20}".prop_map(|id| format!("project-{id}"))
}

/// Generate percentage thresholds (0 to 100 inclusive).
pub fn threshold_strategy() -> impl Strategy<Value = u32> {
    0u32..=100
}

/// Generate attempt counts seen in one observation window.
pub fn attempt_count_strategy() -> impl Strategy<Value = u64> {
    0u64..10_000
}

/// Generate minimum request counts (always at least 1).
pub fn minimum_request_count_strategy() -> impl Strategy<Value = u64> {
    1u64..500
}

/// Generate consecutive-failure thresholds (always at least 1).
pub fn consecutive_failure_threshold_strategy() -> impl Strategy<Value = u64> {
    1u64..50
}

/// Generate cooldown/error timeout durations (1 second to 24 hours).
pub fn error_timeout_strategy() -> impl Strategy<Value = Duration> {
    (1u64..86_400).prop_map(Duration::from_secs)
}

/// Generate observation window durations (1 minute to 1 hour).
pub fn observability_window_strategy() -> impl Strategy<Value = Duration> {
    (60u64..3_600).prop_map(Duration::from_secs)
}

/// Generate short durations for timing-sensitive tests (1ms to 100ms).
pub fn short_duration_strategy() -> impl Strategy<Value = Duration> {
    (1u64..100).prop_map(Duration::from_millis)
}
