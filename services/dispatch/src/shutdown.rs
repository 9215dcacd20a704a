//! Graceful shutdown coordination.
//!
//! Provides structured concurrency with a tracked task set and a
//! broadcast shutdown signal. Long-running batch work (the sampling pass)
//! checks its [`ShutdownSignal`] between units of work so an in-flight
//! batch stops promptly instead of running to completion.

use std::future::Future;
use std::time::Duration;

use tokio::signal;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Shutdown coordinator for graceful termination.
pub struct ShutdownCoordinator {
    /// Broadcast sender for the shutdown signal
    shutdown_tx: broadcast::Sender<()>,
    /// Watch channel flipped once shutdown has completed
    completion_tx: watch::Sender<bool>,
    /// Tracked background tasks
    tasks: JoinSet<()>,
}

impl ShutdownCoordinator {
    /// Creates a new shutdown coordinator.
    #[must_use]
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let (completion_tx, _) = watch::channel(false);

        Self {
            shutdown_tx,
            completion_tx,
            tasks: JoinSet::new(),
        }
    }

    /// Gets a shutdown signal receiver.
    #[must_use]
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            receiver: self.shutdown_tx.subscribe(),
            received: false,
        }
    }

    /// Spawns a background task that will be tracked and cancelled on
    /// shutdown.
    pub fn spawn<F>(&mut self, name: &'static str, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut shutdown = self.subscribe();

        self.tasks.spawn(async move {
            tokio::select! {
                () = future => {
                    info!(task = name, "Background task completed");
                }
                () = shutdown.recv() => {
                    info!(task = name, "Background task cancelled by shutdown");
                }
            }
        });
    }

    /// Initiates graceful shutdown, waiting up to `timeout` for tracked
    /// tasks to finish before aborting them.
    pub async fn shutdown(mut self, timeout: Duration) {
        info!("Initiating graceful shutdown");

        let _ = self.shutdown_tx.send(());

        let drained = tokio::time::timeout(timeout, async {
            while let Some(result) = self.tasks.join_next().await {
                if let Err(e) = result {
                    warn!(error = %e, "Task failed during shutdown");
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!("Shutdown timeout reached, aborting remaining tasks");
            self.tasks.abort_all();
        }

        let _ = self.completion_tx.send(true);

        info!("Shutdown complete");
    }

    /// Returns the number of active tasks.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Shutdown signal receiver.
///
/// Once the signal has been observed it stays observed; repeated
/// [`ShutdownSignal::is_cancelled`] checks keep returning `true`.
pub struct ShutdownSignal {
    receiver: broadcast::Receiver<()>,
    received: bool,
}

impl ShutdownSignal {
    /// Waits for the shutdown signal.
    pub async fn recv(&mut self) {
        if self.received {
            return;
        }
        let _ = self.receiver.recv().await;
        self.received = true;
    }

    /// Checks whether shutdown has been signaled, without blocking.
    pub fn is_cancelled(&mut self) -> bool {
        if !self.received && self.receiver.try_recv().is_ok() {
            self.received = true;
        }
        self.received
    }
}

impl Clone for ShutdownSignal {
    fn clone(&self) -> Self {
        Self {
            receiver: self.receiver.resubscribe(),
            received: self.received,
        }
    }
}

/// Waits for SIGTERM or SIGINT.
pub async fn wait_for_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            info!("Received SIGTERM, initiating shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signal_not_cancelled_before_shutdown() {
        let coordinator = ShutdownCoordinator::new();
        let mut signal = coordinator.subscribe();
        assert!(!signal.is_cancelled());
    }

    #[tokio::test]
    async fn test_signal_latches_after_shutdown() {
        let coordinator = ShutdownCoordinator::new();
        let mut signal = coordinator.subscribe();

        coordinator.shutdown(Duration::from_millis(10)).await;

        assert!(signal.is_cancelled());
        // Latched: stays cancelled on repeated checks
        assert!(signal.is_cancelled());
    }

    #[tokio::test]
    async fn test_spawned_task_cancelled_on_shutdown() {
        let mut coordinator = ShutdownCoordinator::new();
        coordinator.spawn("forever", std::future::pending());
        assert_eq!(coordinator.task_count(), 1);

        coordinator.shutdown(Duration::from_millis(100)).await;
    }

    #[tokio::test]
    async fn test_cloned_signal_observes_shutdown() {
        let coordinator = ShutdownCoordinator::new();
        let signal = coordinator.subscribe();
        let mut cloned = signal.clone();

        coordinator.shutdown(Duration::from_millis(10)).await;

        assert!(cloned.is_cancelled());
    }
}
