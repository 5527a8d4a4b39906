//! Cooperative shutdown flag shared by every background loop.
//!
//! Dropping the sender counts as a shutdown request.

use tokio::sync::watch;

/// Receiving side of the shutdown flag.
pub type ShutdownSignal = watch::Receiver<bool>;

/// Create a shutdown flag, initially clear.
#[must_use]
pub fn shutdown_channel() -> (watch::Sender<bool>, ShutdownSignal) {
    watch::channel(false)
}

/// Non-blocking check, safe to call from blocking threads.
#[must_use]
pub fn is_shutdown_requested(signal: &ShutdownSignal) -> bool {
    *signal.borrow() || signal.has_changed().is_err()
}

/// Resolve once shutdown is requested or the sender is gone.
pub async fn wait_for_shutdown(signal: &mut ShutdownSignal) {
    let _ = signal.wait_for(|stop| *stop).await;
}
