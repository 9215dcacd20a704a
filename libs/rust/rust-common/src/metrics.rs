//! Prometheus metrics helpers.
//!
//! This module provides utilities for exposing metrics in Prometheus format.

use std::sync::atomic::{AtomicU64, Ordering};

/// A simple counter metric.
#[derive(Debug)]
pub struct Counter {
    name: String,
    help: String,
    value: AtomicU64,
}

impl Counter {
    /// Create a new counter.
    #[must_use]
    pub fn new(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            value: AtomicU64::new(0),
        }
    }

    /// Increment the counter by 1.
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the counter by a specific amount.
    pub fn inc_by(&self, amount: u64) {
        self.value.fetch_add(amount, Ordering::Relaxed);
    }

    /// Get the current value.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Get the metric name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Format as Prometheus text.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        format!(
            "# HELP {} {}\n# TYPE {} counter\n{} {}\n",
            self.name, self.help, self.name, self.name, self.get()
        )
    }
}

/// A simple gauge metric.
#[derive(Debug)]
pub struct Gauge {
    name: String,
    help: String,
    value: AtomicU64,
}

impl Gauge {
    /// Create a new gauge.
    #[must_use]
    pub fn new(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            value: AtomicU64::new(0),
        }
    }

    /// Set the gauge value.
    pub fn set(&self, value: u64) {
        self.value.store(value, Ordering::Relaxed);
    }

    /// Increment the gauge by 1.
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrement the gauge by 1.
    pub fn dec(&self) {
        self.value.fetch_sub(1, Ordering::Relaxed);
    }

    /// Get the current value.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Get the metric name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Format as Prometheus text.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        format!(
            "# HELP {} {}\n# TYPE {} gauge\n{} {}\n",
            self.name, self.help, self.name, self.name, self.get()
        )
    }
}

/// Circuit breaker manager metrics.
#[derive(Debug)]
pub struct BreakerMetrics {
    /// Sampling passes run
    pub sampling_passes: Counter,
    /// Breakers opened
    pub opened: Counter,
    /// Breakers closed
    pub closed: Counter,
    /// Breakers moved to half-open
    pub half_opened: Counter,
    /// Store compare-and-swap conflicts observed
    pub store_conflicts: Counter,
    /// Notification sink failures
    pub sink_failures: Counter,
}

impl BreakerMetrics {
    /// Create new breaker metrics with the given prefix.
    #[must_use]
    pub fn new(prefix: &str) -> Self {
        Self {
            sampling_passes: Counter::new(
                format!("{prefix}_sampling_passes_total"),
                "Total number of sampling passes run",
            ),
            opened: Counter::new(
                format!("{prefix}_breaker_opened_total"),
                "Total number of breakers opened",
            ),
            closed: Counter::new(
                format!("{prefix}_breaker_closed_total"),
                "Total number of breakers closed",
            ),
            half_opened: Counter::new(
                format!("{prefix}_breaker_half_opened_total"),
                "Total number of breakers moved to half-open",
            ),
            store_conflicts: Counter::new(
                format!("{prefix}_store_conflicts_total"),
                "Total number of state store update conflicts",
            ),
            sink_failures: Counter::new(
                format!("{prefix}_sink_failures_total"),
                "Total number of notification sink failures",
            ),
        }
    }

    /// Format all metrics as Prometheus text.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        [
            self.sampling_passes.to_prometheus(),
            self.opened.to_prometheus(),
            self.closed.to_prometheus(),
            self.half_opened.to_prometheus(),
            self.store_conflicts.to_prometheus(),
            self.sink_failures.to_prometheus(),
        ]
        .concat()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter() {
        let counter = Counter::new("test_counter", "A test counter");
        assert_eq!(counter.get(), 0);

        counter.inc();
        assert_eq!(counter.get(), 1);

        counter.inc_by(5);
        assert_eq!(counter.get(), 6);
    }

    #[test]
    fn test_gauge() {
        let gauge = Gauge::new("test_gauge", "A test gauge");
        assert_eq!(gauge.get(), 0);

        gauge.set(10);
        assert_eq!(gauge.get(), 10);

        gauge.inc();
        assert_eq!(gauge.get(), 11);

        gauge.dec();
        assert_eq!(gauge.get(), 10);
    }

    #[test]
    fn test_breaker_metrics() {
        let metrics = BreakerMetrics::new("dispatch");

        metrics.sampling_passes.inc();
        metrics.opened.inc();
        metrics.opened.inc();
        metrics.store_conflicts.inc();

        assert_eq!(metrics.sampling_passes.get(), 1);
        assert_eq!(metrics.opened.get(), 2);
        assert_eq!(metrics.store_conflicts.get(), 1);
        assert_eq!(metrics.sink_failures.get(), 0);
    }

    #[test]
    fn test_prometheus_format() {
        let counter = Counter::new("transitions_total", "Total transitions");
        counter.inc_by(42);

        let output = counter.to_prometheus();
        assert!(output.contains("# HELP transitions_total Total transitions"));
        assert!(output.contains("# TYPE transitions_total counter"));
        assert!(output.contains("transitions_total 42"));
    }

    #[test]
    fn test_breaker_metrics_prometheus_output() {
        let metrics = BreakerMetrics::new("dispatch");
        metrics.half_opened.inc();

        let output = metrics.to_prometheus();
        assert!(output.contains("dispatch_sampling_passes_total 0"));
        assert!(output.contains("dispatch_breaker_half_opened_total 1"));
    }
}
