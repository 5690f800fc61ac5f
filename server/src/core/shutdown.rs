//! Graceful shutdown coordination
//!
//! One watch channel fans the stop signal out to every background task;
//! the coordinator keeps the task handles so the process can drain them
//! (bounded by [`SHUTDOWN_TIMEOUT_SECS`]) before exiting.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use super::constants::SHUTDOWN_TIMEOUT_SECS;

#[derive(Clone)]
pub struct ShutdownCoordinator {
    signal: watch::Sender<bool>,
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (signal, _) = watch::channel(false);
        Self {
            signal,
            tasks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A receiver that flips to `true` when shutdown is requested
    pub fn watch(&self) -> watch::Receiver<bool> {
        self.signal.subscribe()
    }

    /// Flag shutdown; all watchers wake up
    pub fn request(&self) {
        self.signal.send_replace(true);
    }

    pub fn is_requested(&self) -> bool {
        *self.signal.borrow()
    }

    /// Keep a task handle so [`drain`](Self::drain) can join it
    pub async fn track(&self, task: JoinHandle<()>) {
        self.tasks.lock().await.push(task);
    }

    /// Request shutdown and join every tracked task, giving up after the
    /// shutdown timeout.
    pub async fn drain(&self) {
        self.request();

        let tasks = std::mem::take(&mut *self.tasks.lock().await);
        if tasks.is_empty() {
            return;
        }
        tracing::debug!(tasks = tasks.len(), "Draining background tasks");

        let join_in_order = async {
            for task in tasks {
                if let Err(e) = task.await
                    && e.is_panic()
                {
                    tracing::error!("Background task panicked during shutdown");
                }
            }
        };
        let budget = Duration::from_secs(SHUTDOWN_TIMEOUT_SECS);
        if tokio::time::timeout(budget, join_in_order).await.is_err() {
            tracing::warn!(
                timeout_secs = SHUTDOWN_TIMEOUT_SECS,
                "Gave up waiting for background tasks"
            );
        } else {
            tracing::debug!("Background tasks drained");
        }
    }

    /// Resolve once shutdown is requested. Consumes a clone, so the
    /// future is `'static` and can be handed to axum's graceful shutdown.
    pub async fn wait(self) {
        let mut rx = self.signal.subscribe();
        let _ = rx.wait_for(|&requested| requested).await;
    }

    /// Turn Ctrl+C / SIGTERM into a shutdown request
    pub fn spawn_signal_listener(&self) {
        let coordinator = self.clone();
        tokio::spawn(async move {
            os_shutdown_signal().await;
            coordinator.request();
        });
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait for the first OS shutdown signal
async fn os_shutdown_signal() {
    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await
            }
        }
    };
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Cannot listen for Ctrl+C");
            }
        }
        _ = sigterm => {}
    }
    tracing::debug!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_watchers_observe_request() {
        let shutdown = ShutdownCoordinator::new();
        let mut rx = shutdown.watch();

        assert!(!shutdown.is_requested());
        assert!(!*rx.borrow());

        shutdown.request();
        assert!(shutdown.is_requested());
        rx.changed().await.unwrap();
        assert!(*rx.borrow());
    }

    #[tokio::test]
    async fn test_request_is_idempotent() {
        let shutdown = ShutdownCoordinator::new();
        shutdown.request();
        shutdown.request();
        assert!(shutdown.is_requested());
    }

    #[tokio::test]
    async fn test_drain_joins_tracked_tasks() {
        let shutdown = ShutdownCoordinator::new();
        let mut rx = shutdown.watch();
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();

        shutdown
            .track(tokio::spawn(async move {
                let _ = rx.wait_for(|&stop| stop).await;
                let _ = done_tx.send(());
            }))
            .await;

        tokio::time::timeout(Duration::from_secs(1), shutdown.drain())
            .await
            .unwrap();
        done_rx.await.unwrap();
    }

    #[tokio::test]
    async fn test_drain_with_nothing_tracked_still_requests() {
        let shutdown = ShutdownCoordinator::new();
        shutdown.drain().await;
        assert!(shutdown.is_requested());
    }

    #[tokio::test]
    async fn test_wait_completes_once_requested() {
        let shutdown = ShutdownCoordinator::new();
        let waiter = tokio::spawn(shutdown.clone().wait());

        tokio::task::yield_now().await;
        shutdown.request();

        tokio::time::timeout(Duration::from_millis(200), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
