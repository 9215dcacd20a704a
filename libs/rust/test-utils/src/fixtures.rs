//! Test fixtures with sample data.

use chrono::{DateTime, Utc};
use rust_common::ManualClock;

/// A fixed instant used as the starting point for deterministic tests.
#[must_use]
pub fn base_time() -> DateTime<Utc> {
    // 2025-01-01T00:00:00Z
    DateTime::from_timestamp(1_735_689_600, 0).unwrap_or(DateTime::UNIX_EPOCH)
}

/// A manual clock frozen at [`base_time`].
#[must_use]
pub fn frozen_clock() -> ManualClock {
    ManualClock::new(base_time())
}

/// A fixture endpoint identifier.
#[must_use]
pub fn endpoint_id(n: u32) -> String {
    format!("ep-{n:08x}")
}

/// A fixture tenant identifier.
#[must_use]
pub fn tenant_id(n: u32) -> String {
    format!("project-{n:04x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_time_is_stable() {
        assert_eq!(base_time(), base_time());
        assert_eq!(base_time().timestamp(), 1_735_689_600);
    }

    #[test]
    fn test_fixture_ids_are_distinct() {
        assert_ne!(endpoint_id(1), endpoint_id(2));
        assert_ne!(tenant_id(1), tenant_id(2));
    }
}
