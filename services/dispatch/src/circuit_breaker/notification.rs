//! Breaker transition notifications.
//!
//! Every observed state transition is pushed to a [`NotificationSink`].
//! Sinks are best-effort: failures are logged and never block or fail the
//! sampling pass that produced the transition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use rust_common::PlatformError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use super::breaker::CircuitState;
use super::config::CircuitBreakerConfig;

/// Kind of transition a notification describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationType {
    /// A breaker transitioned into the open state.
    Opened,
    /// A breaker transitioned into the closed state.
    Closed,
    /// A breaker transitioned into the half-open state.
    HalfOpened,
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Opened => write!(f, "opened"),
            Self::Closed => write!(f, "closed"),
            Self::HalfOpened => write!(f, "half-opened"),
        }
    }
}

/// One observed breaker state transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionEvent {
    /// Endpoint whose breaker transitioned.
    pub endpoint_id: String,
    /// State before the transition.
    pub previous_state: CircuitState,
    /// State after the transition.
    pub new_state: CircuitState,
    /// Config in effect when the transition was evaluated.
    pub config: CircuitBreakerConfig,
    /// Sample time at which the transition occurred.
    pub occurred_at: DateTime<Utc>,
}

impl TransitionEvent {
    /// The notification type implied by the new state.
    #[must_use]
    pub const fn notification_type(&self) -> NotificationType {
        match self.new_state {
            CircuitState::Open => NotificationType::Opened,
            CircuitState::Closed => NotificationType::Closed,
            CircuitState::HalfOpen => NotificationType::HalfOpened,
        }
    }
}

/// Receiver for breaker transition events.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver one transition event.
    async fn notify(&self, event: &TransitionEvent) -> Result<(), PlatformError>;
}

/// Sink that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

#[async_trait]
impl NotificationSink for NoopSink {
    async fn notify(&self, _event: &TransitionEvent) -> Result<(), PlatformError> {
        Ok(())
    }
}

/// Boxed async callback invoked per event.
type NotifyFn =
    dyn Fn(TransitionEvent) -> BoxFuture<'static, Result<(), PlatformError>> + Send + Sync;

/// Sink wrapping a single async callback.
pub struct CallbackSink {
    callback: Box<NotifyFn>,
}

impl CallbackSink {
    /// Wrap an async callback as a sink.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(TransitionEvent) -> BoxFuture<'static, Result<(), PlatformError>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }
}

impl std::fmt::Debug for CallbackSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackSink").finish_non_exhaustive()
    }
}

#[async_trait]
impl NotificationSink for CallbackSink {
    async fn notify(&self, event: &TransitionEvent) -> Result<(), PlatformError> {
        (self.callback)(event.clone()).await
    }
}

/// Sink that fans one event out to several sinks.
///
/// Every sink is attempted even when earlier ones fail; failures are
/// logged individually and reported once as an aggregate error.
pub struct FanoutSink {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl FanoutSink {
    /// Create a fan-out over the given sinks.
    #[must_use]
    pub fn new(sinks: Vec<Arc<dyn NotificationSink>>) -> Self {
        Self { sinks }
    }

    /// Add another sink to the fan-out.
    pub fn push(&mut self, sink: Arc<dyn NotificationSink>) {
        self.sinks.push(sink);
    }
}

impl std::fmt::Debug for FanoutSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanoutSink")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

#[async_trait]
impl NotificationSink for FanoutSink {
    async fn notify(&self, event: &TransitionEvent) -> Result<(), PlatformError> {
        let mut failed = 0usize;
        for sink in &self.sinks {
            if let Err(error) = sink.notify(event).await {
                failed += 1;
                warn!(
                    endpoint = %event.endpoint_id,
                    error = %error,
                    "Notification sink failed"
                );
            }
        }

        if failed == 0 {
            Ok(())
        } else {
            Err(PlatformError::internal(format!(
                "{failed} notification sinks failed"
            )))
        }
    }
}
