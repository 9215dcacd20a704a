//! Redis-backed breaker store shared by all dispatch instances.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use rust_common::PlatformError;

use super::BreakerStore;
use crate::circuit_breaker::breaker::CircuitBreaker;

/// Compare-and-swap executed server-side so racing writers cannot
/// interleave between the version check and the write. Returns 1 on
/// success, 0 on version mismatch, -1 when the record is missing.
const CAS_SCRIPT: &str = r"
local current = redis.call('GET', KEYS[1])
if current == false then
  return -1
end
local record = cjson.decode(current)
if tonumber(record['version']) ~= tonumber(ARGV[1]) then
  return 0
end
redis.call('SET', KEYS[1], ARGV[2])
return 1
";

/// Distributed [`BreakerStore`] backed by a shared Redis instance.
pub struct RedisStore {
    conn: ConnectionManager,
    cas: redis::Script,
}

impl RedisStore {
    /// Connect to Redis at the given URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the client or connection manager cannot be
    /// created.
    pub async fn new(redis_url: &str) -> Result<Self, PlatformError> {
        let client =
            redis::Client::open(redis_url).map_err(|e| PlatformError::store(e.to_string()))?;

        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| PlatformError::store(e.to_string()))?;

        Ok(Self {
            conn,
            cas: redis::Script::new(CAS_SCRIPT),
        })
    }

    fn breaker_key(endpoint_id: &str) -> String {
        format!("breaker:{endpoint_id}")
    }
}

#[async_trait]
impl BreakerStore for RedisStore {
    async fn get(&self, endpoint_id: &str) -> Result<Option<CircuitBreaker>, PlatformError> {
        let mut conn = self.conn.clone();
        let key = Self::breaker_key(endpoint_id);

        let value: Option<String> = conn
            .get(&key)
            .await
            .map_err(|e| PlatformError::store(e.to_string()))?;

        match value {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn create_if_absent(&self, breaker: &CircuitBreaker) -> Result<(), PlatformError> {
        let mut conn = self.conn.clone();
        let key = Self::breaker_key(&breaker.endpoint_id);
        let value = serde_json::to_string(breaker)?;

        // Losing the creation race to another instance is fine; the caller
        // re-reads before updating.
        let _created: bool = conn
            .set_nx(&key, &value)
            .await
            .map_err(|e| PlatformError::store(e.to_string()))?;

        Ok(())
    }

    async fn compare_and_swap(
        &self,
        expected_version: u64,
        breaker: &CircuitBreaker,
    ) -> Result<(), PlatformError> {
        let mut conn = self.conn.clone();
        let key = Self::breaker_key(&breaker.endpoint_id);
        let value = serde_json::to_string(breaker)?;

        let verdict: i64 = self
            .cas
            .key(&key)
            .arg(expected_version)
            .arg(&value)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| PlatformError::store(e.to_string()))?;

        match verdict {
            1 => Ok(()),
            0 => Err(PlatformError::conflict(&breaker.endpoint_id)),
            _ => Err(PlatformError::NotFound(breaker.endpoint_id.clone())),
        }
    }
}
