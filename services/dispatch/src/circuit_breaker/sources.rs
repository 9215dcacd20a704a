//! Statistics and config feeds consumed by the manager.
//!
//! Both feeds are pull sources invoked once per pass: the statistics feed
//! aggregates the delivery attempt log over the trailing observation
//! window, the config feed returns the per-tenant breaker configs
//! currently in effect.

use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use rust_common::{Clock, PlatformError};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::config::CircuitBreakerConfig;

/// Delivery attempt counts for one endpoint over the polled window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptStats {
    /// Tenant that owns the endpoint.
    pub tenant_id: String,
    /// Failed delivery attempts in the window.
    pub failure_count: u64,
    /// Successful delivery attempts in the window.
    pub success_count: u64,
}

impl AttemptStats {
    /// Total attempts observed in the window.
    #[must_use]
    pub const fn request_volume(&self) -> u64 {
        self.failure_count + self.success_count
    }
}

/// Pull source for per-endpoint delivery attempt statistics.
#[async_trait]
pub trait AttemptStatsSource: Send + Sync {
    /// Return attempt counts per endpoint for the trailing `window`
    /// ending now.
    async fn poll(&self, window: Duration) -> Result<HashMap<String, AttemptStats>, PlatformError>;
}

/// Pull source for the per-tenant breaker configs currently in effect.
#[async_trait]
pub trait BreakerConfigSource: Send + Sync {
    /// Return the config table, keyed by tenant id.
    async fn load(&self) -> Result<HashMap<String, CircuitBreakerConfig>, PlatformError>;
}

/// Attempt statistics read from the Redis attempt log.
///
/// Delivery workers record each attempt outcome into per-endpoint sorted
/// sets scored by unix milliseconds (`attempts:{endpoint}:success` /
/// `attempts:{endpoint}:failure`), register the endpoint in the
/// `attempts:endpoints` set and its tenant in the `attempts:tenants`
/// hash. This source only reads.
pub struct RedisAttemptStatsSource {
    conn: ConnectionManager,
    clock: Arc<dyn Clock>,
}

const ENDPOINTS_KEY: &str = "attempts:endpoints";
const TENANTS_KEY: &str = "attempts:tenants";

impl RedisAttemptStatsSource {
    /// Connect to the attempt log at the given Redis URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the client or connection manager cannot be
    /// created.
    pub async fn new(redis_url: &str, clock: Arc<dyn Clock>) -> Result<Self, PlatformError> {
        let client =
            redis::Client::open(redis_url).map_err(|e| PlatformError::store(e.to_string()))?;

        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| PlatformError::store(e.to_string()))?;

        Ok(Self { conn, clock })
    }

    async fn window_count(
        conn: &mut ConnectionManager,
        key: &str,
        from_ms: i64,
    ) -> Result<u64, PlatformError> {
        conn.zcount(key, from_ms, "+inf")
            .await
            .map_err(|e| PlatformError::unavailable(e.to_string()))
    }
}

#[async_trait]
impl AttemptStatsSource for RedisAttemptStatsSource {
    async fn poll(&self, window: Duration) -> Result<HashMap<String, AttemptStats>, PlatformError> {
        let mut conn = self.conn.clone();

        let now = self.clock.now();
        let window = ChronoDuration::from_std(window)
            .map_err(|e| PlatformError::invalid_input(e.to_string()))?;
        let from_ms = (now - window).timestamp_millis();

        let endpoints: Vec<String> = conn
            .smembers(ENDPOINTS_KEY)
            .await
            .map_err(|e| PlatformError::unavailable(e.to_string()))?;

        let mut stats = HashMap::with_capacity(endpoints.len());
        for endpoint_id in endpoints {
            let tenant_id: Option<String> = conn
                .hget(TENANTS_KEY, &endpoint_id)
                .await
                .map_err(|e| PlatformError::unavailable(e.to_string()))?;
            let Some(tenant_id) = tenant_id else {
                debug!(endpoint = %endpoint_id, "Attempt log has no tenant mapping, skipping");
                continue;
            };

            let success_count = Self::window_count(
                &mut conn,
                &format!("attempts:{endpoint_id}:success"),
                from_ms,
            )
            .await?;
            let failure_count = Self::window_count(
                &mut conn,
                &format!("attempts:{endpoint_id}:failure"),
                from_ms,
            )
            .await?;

            stats.insert(
                endpoint_id,
                AttemptStats {
                    tenant_id,
                    failure_count,
                    success_count,
                },
            );
        }

        Ok(stats)
    }
}

/// Per-tenant breaker configs read from a JSON document.
///
/// The document is a map from tenant id to config, produced by the
/// project-settings layer. The file is re-read on every load so edits
/// take effect at the next refresh.
#[derive(Debug, Clone)]
pub struct JsonConfigSource {
    path: PathBuf,
}

impl JsonConfigSource {
    /// Create a source reading from the given path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl BreakerConfigSource for JsonConfigSource {
    async fn load(&self) -> Result<HashMap<String, CircuitBreakerConfig>, PlatformError> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            PlatformError::unavailable(format!(
                "config document {} unreadable: {e}",
                self.path.display()
            ))
        })?;

        Ok(serde_json::from_slice(&bytes)?)
    }
}
