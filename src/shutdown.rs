//! The run-wide cancellation signal.
use std::sync::Arc;

use tokio::sync::watch;

pub type ShutdownSender = watch::Sender<bool>;
pub type ShutdownReceiver = watch::Receiver<bool>;

#[must_use]
pub fn shutdown_channel() -> (ShutdownSender, ShutdownReceiver) {
    watch::channel(false)
}

/// Cloneable handle that cancels a run from any task or thread.
///
/// The flag moves from running to stopped exactly once; later calls are
/// no-ops.
#[derive(Debug, Clone)]
pub struct StopHandle {
    shutdown_tx: Arc<ShutdownSender>,
}

impl StopHandle {
    #[must_use]
    pub fn new() -> Self {
        let (shutdown_tx, _) = shutdown_channel();
        Self {
            shutdown_tx: Arc::new(shutdown_tx),
        }
    }

    /// Requests cancellation. Returns `true` only for the call that actually
    /// stopped the run.
    pub fn stop(&self) -> bool {
        self.shutdown_tx.send_if_modified(|stopped| {
            if *stopped {
                false
            } else {
                *stopped = true;
                true
            }
        })
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> ShutdownReceiver {
        self.shutdown_tx.subscribe()
    }
}

impl Default for StopHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves once cancellation has been requested.
///
/// If every sender is gone the run can no longer be cancelled, so this never
/// resolves.
pub async fn wait_for_shutdown(shutdown_rx: &mut ShutdownReceiver) {
    if shutdown_rx.wait_for(|stopped| *stopped).await.is_err() {
        std::future::pending::<()>().await;
    }
}
