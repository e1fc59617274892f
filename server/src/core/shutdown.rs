//! Centralized shutdown management.
//!
//! Coordinates graceful shutdown across background tasks (room pumps, queue
//! bridges, health-check tickers) and external resources (database pools,
//! pub/sub connections) without hard-coding which services exist: callers
//! register a [`JoinHandle`] for every background task and a close future for
//! every resource that needs a final flush/disconnect.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use super::constants::SHUTDOWN_TIMEOUT_SECS;

type CloseFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Centralized shutdown service for coordinating graceful shutdown.
#[derive(Clone)]
pub struct ShutdownService {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
    handles: Arc<Mutex<Vec<JoinHandle<()>>>>,
    closers: Arc<Mutex<Vec<CloseFuture>>>,
}

impl ShutdownService {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
            handles: Arc::new(Mutex::new(Vec::new())),
            closers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Register a background task handle to be awaited during shutdown.
    pub async fn register(&self, handle: JoinHandle<()>) {
        self.handles.lock().await.push(handle);
    }

    /// Register a resource-close future (pool shutdown, pub/sub disconnect,
    /// ...) to run after background tasks have drained.
    pub async fn register_closer<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.closers.lock().await.push(Box::pin(fut));
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.rx.clone()
    }

    /// Trigger shutdown without waiting for it to complete.
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Trigger shutdown and wait for all registered tasks and resources.
    ///
    /// Shutdown order (to prevent data loss):
    /// 1. Signal all tasks to stop accepting new work.
    /// 2. Wait for background tasks to finish draining (bounded by timeout).
    /// 3. Run every registered closer concurrently.
    pub async fn shutdown(&self) {
        tracing::debug!("Initiating graceful shutdown...");
        self.trigger();

        let handles = std::mem::take(&mut *self.handles.lock().await);
        let task_count = handles.len();
        tracing::debug!(
            count = task_count,
            "Waiting for background tasks to finish..."
        );

        let timeout = Duration::from_secs(SHUTDOWN_TIMEOUT_SECS);
        match tokio::time::timeout(timeout, futures::future::join_all(handles)).await {
            Ok(_) => tracing::debug!("All background tasks completed"),
            Err(_) => tracing::warn!(
                timeout_secs = timeout.as_secs(),
                "Timeout waiting for background tasks"
            ),
        }

        let closers = std::mem::take(&mut *self.closers.lock().await);
        tracing::debug!(count = closers.len(), "Closing registered resources...");
        futures::future::join_all(closers).await;

        tracing::debug!("Shutdown complete");
    }

    /// Wait for shutdown signal (for use with axum graceful shutdown).
    pub fn wait(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.rx.clone();
        async move {
            let _ = rx.wait_for(|&v| v).await;
        }
    }

    /// Install OS signal handlers and auto-trigger on Ctrl+C/SIGTERM.
    pub fn install_signal_handlers(&self) {
        let service = self.clone();
        tokio::spawn(async move {
            let ctrl_c = async {
                tokio::signal::ctrl_c()
                    .await
                    .expect("Failed to install Ctrl+C handler");
            };

            #[cfg(unix)]
            let terminate = async {
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("Failed to install SIGTERM handler")
                    .recv()
                    .await;
            };

            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                _ = ctrl_c => tracing::debug!("Received Ctrl+C, shutting down"),
                _ = terminate => tracing::debug!("Received SIGTERM, shutting down"),
            }

            service.trigger();
        });
    }
}

impl Default for ShutdownService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn test_shutdown_not_triggered_initially() {
        let shutdown = ShutdownService::new();
        assert!(!shutdown.is_triggered());
    }

    #[tokio::test]
    async fn test_shutdown_trigger() {
        let shutdown = ShutdownService::new();
        shutdown.trigger();
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn test_shutdown_wait_returns_after_trigger() {
        let shutdown = ShutdownService::new();
        let wait_future = shutdown.wait();
        let handle = tokio::spawn(wait_future);

        tokio::task::yield_now().await;
        shutdown.trigger();

        tokio::time::timeout(std::time::Duration::from_millis(100), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_subscriber_receives_shutdown() {
        let shutdown = ShutdownService::new();
        let rx = shutdown.subscribe();
        assert!(!*rx.borrow());
        shutdown.trigger();
        assert!(*rx.borrow());
    }

    #[tokio::test]
    async fn test_closers_run_during_shutdown() {
        let shutdown = ShutdownService::new();
        let closed = Arc::new(AtomicBool::new(false));
        let closed2 = closed.clone();
        shutdown
            .register_closer(async move {
                closed2.store(true, Ordering::SeqCst);
            })
            .await;

        shutdown.shutdown().await;
        assert!(closed.load(Ordering::SeqCst));
    }
}
