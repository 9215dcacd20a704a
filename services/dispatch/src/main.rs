//! Dispatch service entry point.

use std::sync::Arc;

use dispatch_service::circuit_breaker::{
    CircuitBreakerManager, JsonConfigSource, RedisAttemptStatsSource, RedisStore,
};
use dispatch_service::config::Config;
use dispatch_service::sampler::Sampler;
use dispatch_service::shutdown::{self, ShutdownCoordinator};
use rust_common::{SystemClock, TracingConfig, init_tracing};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    let mut tracing_config = TracingConfig::default()
        .with_service_name("dispatch-service")
        .with_log_level(config.log_level.clone());
    if config.log_json {
        tracing_config = tracing_config.with_json_output();
    }
    init_tracing(&tracing_config);

    info!("Starting dispatch service");

    let clock = Arc::new(SystemClock);
    let store = Arc::new(RedisStore::new(config.redis_url.as_str()).await?);
    let stats = Arc::new(
        RedisAttemptStatsSource::new(config.redis_url.as_str(), clock.clone()).await?,
    );
    let configs = Arc::new(JsonConfigSource::new(config.tenant_config_path.clone()));

    let manager = Arc::new(
        CircuitBreakerManager::builder()
            .store(store)
            .clock(clock)
            .default_config(config.default_breaker_config())
            .build()?,
    );

    let sampler = Sampler::new(
        manager,
        stats,
        configs,
        config.sample_interval(),
        config.config_refresh_interval(),
    );

    let mut coordinator = ShutdownCoordinator::new();
    let signal = coordinator.subscribe();
    coordinator.spawn("sampler", sampler.run(signal));

    shutdown::wait_for_signal().await;
    coordinator.shutdown(config.shutdown_timeout()).await;

    Ok(())
}
