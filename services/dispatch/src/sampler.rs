//! Periodic driver for the circuit breaker manager.
//!
//! The manager itself has no scheduler; this task invokes its two entry
//! points on independent cadences until shutdown. Refresh failures keep
//! the last-good config table; sampling failures are logged and retried
//! at the next tick.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::circuit_breaker::{AttemptStatsSource, BreakerConfigSource, CircuitBreakerManager};
use crate::error::DispatchError;
use crate::shutdown::ShutdownSignal;

/// Drives config refreshes and sampling passes on fixed intervals.
pub struct Sampler {
    manager: Arc<CircuitBreakerManager>,
    stats: Arc<dyn AttemptStatsSource>,
    configs: Arc<dyn BreakerConfigSource>,
    sample_interval: Duration,
    refresh_interval: Duration,
}

impl Sampler {
    /// Create a sampler over the given manager and feeds.
    #[must_use]
    pub fn new(
        manager: Arc<CircuitBreakerManager>,
        stats: Arc<dyn AttemptStatsSource>,
        configs: Arc<dyn BreakerConfigSource>,
        sample_interval: Duration,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            manager,
            stats,
            configs,
            sample_interval,
            refresh_interval,
        }
    }

    /// Run until the shutdown signal fires.
    pub async fn run(self, mut shutdown: ShutdownSignal) {
        let mut batch_signal = shutdown.clone();

        let mut sample_tick = interval(self.sample_interval);
        sample_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut refresh_tick = interval(self.refresh_interval);
        refresh_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // Load the config table before the first sampling pass; on failure
        // the manager falls back to its default config.
        if let Err(error) = self.manager.refresh_configs(self.configs.as_ref()).await {
            warn!(error = %error, "Initial config refresh failed, using default config");
        }

        loop {
            tokio::select! {
                () = shutdown.recv() => {
                    info!("Sampler stopping");
                    break;
                }
                _ = refresh_tick.tick() => {
                    if let Err(error) = self.manager.refresh_configs(self.configs.as_ref()).await {
                        warn!(error = %error, "Config refresh failed, keeping last-good table");
                    }
                }
                _ = sample_tick.tick() => {
                    match self
                        .manager
                        .sample_and_update(self.stats.as_ref(), &mut batch_signal)
                        .await
                    {
                        Ok(report) => debug!(
                            evaluated = report.evaluated,
                            transitions = report.transitions,
                            "Sampling pass complete"
                        ),
                        Err(DispatchError::Cancelled) => {
                            info!("Sampling pass cancelled by shutdown");
                            break;
                        }
                        Err(error) => warn!(error = %error, "Sampling pass failed"),
                    }
                }
            }
        }
    }
}
