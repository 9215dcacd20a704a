//! Circuit breaker manager.
//!
//! Orchestrates one sampling pass: pull attempt statistics, resolve each
//! endpoint's tenant config, evaluate the state machine against the
//! breaker record in the shared store, persist the result through
//! compare-and-swap, and dispatch notifications for observed transitions.
//!
//! The manager holds no scheduler and no per-endpoint locks. Many manager
//! instances across processes may sample concurrently; consistency comes
//! from the store's versioned compare-and-swap, with a losing writer
//! re-evaluating against freshly read state.

use arc_swap::ArcSwap;
use rust_common::{BreakerMetrics, Clock, PlatformError, RetryConfig, RetryPolicy};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::breaker::CircuitBreaker;
use super::config::CircuitBreakerConfig;
use super::notification::{FanoutSink, NoopSink, NotificationSink, TransitionEvent};
use super::sources::{AttemptStats, AttemptStatsSource, BreakerConfigSource};
use super::store::BreakerStore;
use crate::error::{DispatchError, EndpointFailure};
use crate::shutdown::ShutdownSignal;

/// Bounded attempts for a lost compare-and-swap race before the endpoint
/// is surfaced as failed for this pass.
const CAS_MAX_ATTEMPTS: u32 = 3;

/// Outcome of one completed sampling pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SampleReport {
    /// Endpoints evaluated in this pass.
    pub evaluated: usize,
    /// State transitions observed in this pass.
    pub transitions: usize,
}

/// Per-endpoint circuit breaker manager with shared distributed state.
///
/// Both entry points ([`Self::refresh_configs`] and
/// [`Self::sample_and_update`]) are safe to invoke concurrently with
/// themselves and with each other.
pub struct CircuitBreakerManager {
    store: Arc<dyn BreakerStore>,
    clock: Arc<dyn Clock>,
    configs: ArcSwap<HashMap<String, CircuitBreakerConfig>>,
    default_config: CircuitBreakerConfig,
    sink: Arc<dyn NotificationSink>,
    cas_retry: RetryPolicy,
    metrics: BreakerMetrics,
}

impl CircuitBreakerManager {
    /// Start building a manager.
    #[must_use]
    pub fn builder() -> CircuitBreakerManagerBuilder {
        CircuitBreakerManagerBuilder::default()
    }

    /// Pull the current per-tenant config table and atomically replace the
    /// in-memory snapshot.
    ///
    /// A refresh is all-or-nothing: if the source fails or any fetched
    /// config is invalid, the previous table stays in effect and no
    /// breaker state is touched.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::ConfigSourceUnavailable`] when the source
    /// cannot be read and [`DispatchError::InvalidTenantConfig`] when a
    /// fetched config fails validation.
    pub async fn refresh_configs(
        &self,
        source: &dyn BreakerConfigSource,
    ) -> Result<(), DispatchError> {
        let table = source
            .load()
            .await
            .map_err(DispatchError::ConfigSourceUnavailable)?;

        for (tenant, config) in &table {
            config
                .validate()
                .map_err(|source| DispatchError::InvalidTenantConfig {
                    tenant: tenant.clone(),
                    source,
                })?;
        }

        let tenants = table.len();
        self.configs.store(Arc::new(table));
        info!(tenants, "Circuit breaker config table refreshed");
        Ok(())
    }

    /// Run one sampling pass over every endpoint the statistics source
    /// reports.
    ///
    /// Per-endpoint store failures are isolated: the pass continues and
    /// the failures are aggregated into the returned error, with each
    /// failed endpoint left at its last known-good state. Notification
    /// sink failures are logged and never fail the pass.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::StatsSourceUnavailable`] when the
    /// statistics source cannot be polled (no safe decision without fresh
    /// stats), [`DispatchError::Cancelled`] when `shutdown` fires
    /// mid-batch, and [`DispatchError::SamplingPartial`] when some
    /// endpoints failed to update.
    pub async fn sample_and_update(
        &self,
        source: &dyn AttemptStatsSource,
        shutdown: &mut ShutdownSignal,
    ) -> Result<SampleReport, DispatchError> {
        let stats = source
            .poll(self.observation_window())
            .await
            .map_err(DispatchError::StatsSourceUnavailable)?;

        self.metrics.sampling_passes.inc();

        let table = self.configs.load_full();
        let mut report = SampleReport {
            evaluated: stats.len(),
            transitions: 0,
        };
        let mut failures = Vec::new();

        for (endpoint_id, attempt) in &stats {
            if shutdown.is_cancelled() {
                return Err(DispatchError::Cancelled);
            }

            let config = table.get(&attempt.tenant_id).unwrap_or(&self.default_config);

            match self.update_endpoint(endpoint_id, attempt, config).await {
                Ok(Some(event)) => {
                    report.transitions += 1;
                    self.record_transition(&event);

                    if let Err(error) = self.sink.notify(&event).await {
                        self.metrics.sink_failures.inc();
                        warn!(
                            endpoint = %endpoint_id,
                            error = %error,
                            "Transition notification failed"
                        );
                    }
                }
                Ok(None) => {}
                Err(error) => {
                    warn!(
                        endpoint = %endpoint_id,
                        error = %error,
                        "Breaker update failed, keeping last known-good state"
                    );
                    failures.push(EndpointFailure {
                        endpoint_id: endpoint_id.clone(),
                        error,
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(report)
        } else {
            Err(DispatchError::SamplingPartial { failures })
        }
    }

    /// Whether delivery attempts may currently be sent to this endpoint.
    ///
    /// Endpoints without a breaker record are allowed: a breaker is only
    /// created once the endpoint shows up in the attempt log.
    ///
    /// # Errors
    ///
    /// Returns the store error if the record cannot be read.
    pub async fn is_allowed(&self, endpoint_id: &str) -> Result<bool, PlatformError> {
        let Some(breaker) = self.store.get(endpoint_id).await? else {
            return Ok(true);
        };

        let table = self.configs.load();
        let config = table
            .get(&breaker.tenant_id)
            .unwrap_or(&self.default_config);

        Ok(breaker.is_allowed(config))
    }

    /// Fetch the current breaker record for an endpoint, if one exists.
    ///
    /// # Errors
    ///
    /// Returns the store error if the record cannot be read.
    pub async fn breaker_snapshot(
        &self,
        endpoint_id: &str,
    ) -> Result<Option<CircuitBreaker>, PlatformError> {
        self.store.get(endpoint_id).await
    }

    /// Metrics recorded by this manager.
    #[must_use]
    pub const fn metrics(&self) -> &BreakerMetrics {
        &self.metrics
    }

    /// The widest observation window across the default config and all
    /// tenant configs, used to poll the statistics source once per pass.
    fn observation_window(&self) -> Duration {
        let table = self.configs.load();
        table
            .values()
            .map(|config| config.observability_window)
            .fold(self.default_config.observability_window, Duration::max)
    }

    /// Read-evaluate-write for one endpoint, retried on lost
    /// compare-and-swap races up to [`CAS_MAX_ATTEMPTS`].
    async fn update_endpoint(
        &self,
        endpoint_id: &str,
        attempt: &AttemptStats,
        config: &CircuitBreakerConfig,
    ) -> Result<Option<TransitionEvent>, PlatformError> {
        let store = self.store.as_ref();
        let clock = self.clock.as_ref();
        let metrics = &self.metrics;

        self.cas_retry
            .execute(|| async move {
                let current = match store.get(endpoint_id).await? {
                    Some(breaker) => breaker,
                    None => {
                        let fresh =
                            CircuitBreaker::new(endpoint_id, &attempt.tenant_id, clock.now());
                        store.create_if_absent(&fresh).await?;
                        // Another instance may have won the creation race;
                        // re-read for the authoritative record.
                        store.get(endpoint_id).await?.unwrap_or(fresh)
                    }
                };

                let now = clock.now();
                let mut updated = current.clone();
                updated.tenant_id.clone_from(&attempt.tenant_id);
                let previous = updated.apply_sample(config, attempt, now);
                updated.version = current.version + 1;

                match store.compare_and_swap(current.version, &updated).await {
                    Ok(()) => Ok(previous.map(|previous_state| TransitionEvent {
                        endpoint_id: endpoint_id.to_string(),
                        previous_state,
                        new_state: updated.state,
                        config: config.clone(),
                        occurred_at: now,
                    })),
                    Err(error) => {
                        if matches!(error, PlatformError::Conflict { .. }) {
                            metrics.store_conflicts.inc();
                        }
                        Err(error)
                    }
                }
            })
            .await
    }

    fn record_transition(&self, event: &TransitionEvent) {
        use super::notification::NotificationType;

        info!(
            endpoint = %event.endpoint_id,
            from = %event.previous_state,
            to = %event.new_state,
            "Circuit breaker transitioned"
        );

        match event.notification_type() {
            NotificationType::Opened => self.metrics.opened.inc(),
            NotificationType::Closed => self.metrics.closed.inc(),
            NotificationType::HalfOpened => self.metrics.half_opened.inc(),
        }
    }
}

/// Builder for [`CircuitBreakerManager`].
///
/// Store, clock, and default config are mandatory; notification sinks are
/// optional and default to a no-op.
#[derive(Default)]
pub struct CircuitBreakerManagerBuilder {
    store: Option<Arc<dyn BreakerStore>>,
    clock: Option<Arc<dyn Clock>>,
    default_config: Option<CircuitBreakerConfig>,
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl CircuitBreakerManagerBuilder {
    /// Set the shared breaker state store.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn BreakerStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the time source.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set the fallback config for tenants without an explicit one.
    #[must_use]
    pub fn default_config(mut self, config: CircuitBreakerConfig) -> Self {
        self.default_config = Some(config);
        self
    }

    /// Register a notification sink. May be called multiple times; all
    /// registered sinks receive every transition.
    #[must_use]
    pub fn notification_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Build the manager.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::InvalidInput`] when a mandatory option is
    /// missing or the default config fails validation.
    pub fn build(mut self) -> Result<CircuitBreakerManager, PlatformError> {
        let store = self
            .store
            .ok_or_else(|| PlatformError::invalid_input("breaker store is required"))?;
        let clock = self
            .clock
            .ok_or_else(|| PlatformError::invalid_input("clock is required"))?;
        let default_config = self
            .default_config
            .ok_or_else(|| PlatformError::invalid_input("default config is required"))?;
        default_config.validate()?;

        let sink: Arc<dyn NotificationSink> = match self.sinks.len() {
            0 => Arc::new(NoopSink),
            1 => self.sinks.remove(0),
            _ => Arc::new(FanoutSink::new(self.sinks)),
        };

        Ok(CircuitBreakerManager {
            store,
            clock,
            configs: ArcSwap::from_pointee(HashMap::new()),
            default_config,
            sink,
            cas_retry: RetryPolicy::new(
                RetryConfig::default()
                    .with_max_retries(CAS_MAX_ATTEMPTS)
                    .with_initial_delay(Duration::from_millis(25)),
            ),
            metrics: BreakerMetrics::new("dispatch"),
        })
    }
}
