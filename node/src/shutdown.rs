//! Graceful shutdown for the Agora node.
//!
//! The first trigger wins: it records why the node is stopping and
//! broadcasts once to every subscribed task. Later triggers are ignored.

use std::fmt;
use std::sync::OnceLock;

use tokio::signal;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGINT / Ctrl-C.
    Interrupt,
    /// SIGTERM.
    Terminate,
    /// [`ShutdownController::shutdown`] was called.
    Requested,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Interrupt => "SIGINT",
            Self::Terminate => "SIGTERM",
            Self::Requested => "requested",
        })
    }
}

/// Fans a single stop signal out to the scheduler and other node tasks.
pub struct ShutdownController {
    tx: broadcast::Sender<()>,
    reason: OnceLock<ShutdownReason>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            reason: OnceLock::new(),
        }
    }

    /// A receiver that yields once shutdown is triggered.
    ///
    /// Subscribe before triggering; a late subscriber sees nothing.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    pub fn shutdown(&self) {
        self.trigger(ShutdownReason::Requested);
    }

    fn trigger(&self, reason: ShutdownReason) {
        if self.reason.set(reason).is_ok() {
            tracing::info!(%reason, "shutdown triggered");
            // No receivers simply means nothing is running yet.
            let _ = self.tx.send(());
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.reason.get().is_some()
    }

    /// Why the node is stopping, once it is.
    pub fn reason(&self) -> Option<ShutdownReason> {
        self.reason.get().copied()
    }

    /// Wait for SIGINT or SIGTERM, trigger shutdown and return the reason
    /// recorded (which may be an earlier programmatic trigger).
    pub async fn wait_for_signal(&self) -> ShutdownReason {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                tracing::warn!(error = %e, "SIGINT handler unavailable");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "SIGTERM handler unavailable");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        let mut requested = self.subscribe();
        if let Some(earlier) = self.reason() {
            return earlier;
        }
        let reason = tokio::select! {
            _ = ctrl_c => ShutdownReason::Interrupt,
            _ = terminate => ShutdownReason::Terminate,
            _ = requested.recv() => ShutdownReason::Requested,
        };
        self.trigger(reason);
        self.reason().unwrap_or(reason)
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_subscriber_is_notified() {
        let controller = ShutdownController::new();
        let mut scheduler = controller.subscribe();
        let mut other = controller.subscribe();
        controller.shutdown();
        assert!(scheduler.recv().await.is_ok());
        assert!(other.recv().await.is_ok());
        assert_eq!(controller.reason(), Some(ShutdownReason::Requested));
    }

    #[tokio::test]
    async fn only_first_trigger_counts() {
        let controller = ShutdownController::new();
        let mut rx = controller.subscribe();
        controller.trigger(ShutdownReason::Terminate);
        controller.shutdown();
        assert!(rx.recv().await.is_ok());
        assert!(rx.try_recv().is_err());
        assert_eq!(controller.reason(), Some(ShutdownReason::Terminate));
    }

    #[tokio::test]
    async fn programmatic_shutdown_ends_signal_wait() {
        let controller = std::sync::Arc::new(ShutdownController::new());
        let waiter = {
            let controller = std::sync::Arc::clone(&controller);
            tokio::spawn(async move { controller.wait_for_signal().await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        controller.shutdown();
        assert_eq!(waiter.await.unwrap(), ShutdownReason::Requested);
    }

    #[test]
    fn untriggered_controller_has_no_reason() {
        let controller = ShutdownController::new();
        assert!(!controller.is_triggered());
        assert_eq!(controller.reason(), None);
    }
}
