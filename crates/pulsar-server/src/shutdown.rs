//! Shutdown coordination.
//!
//! A [`ShutdownSignal`] is shared by the accept loops, every open
//! connection and the [`Launcher`](crate::Launcher). Triggering it stops
//! accepting, closes open connections and lets the server thread tear down.
//!
//! # Example
//!
//! ```rust,ignore
//! use pulsar_server::ShutdownSignal;
//!
//! let shutdown = ShutdownSignal::new();
//!
//! tokio::select! {
//!     () = shutdown.recv() => println!("stopping"),
//!     () = tokio::time::sleep(Duration::from_secs(60)) => println!("timeout"),
//! }
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Notify};

/// A signal that can be used to trigger and await shutdown.
///
/// Clones share state: triggering one triggers all of them.
///
/// # Example
///
/// ```rust
/// use pulsar_server::ShutdownSignal;
///
/// let shutdown = ShutdownSignal::new();
/// let observer = shutdown.clone();
///
/// shutdown.trigger();
/// assert!(observer.is_shutdown());
/// ```
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    sender: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    /// Creates a new, untriggered signal.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Triggers the signal. Later calls do nothing.
    pub fn trigger(&self) {
        self.sender.send_if_modified(|triggered| {
            let first = !*triggered;
            *triggered = true;
            first
        });
    }

    /// Returns `true` if the signal has been triggered.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        *self.sender.borrow()
    }

    /// Returns a future that completes once the signal is triggered.
    ///
    /// Completes immediately if it already was.
    pub fn recv(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut receiver = self.sender.subscribe();
        async move {
            while !*receiver.borrow_and_update() {
                // Errs only once every clone is gone.
                if receiver.changed().await.is_err() {
                    return;
                }
            }
        }
    }

    /// Triggers this signal on SIGINT or SIGTERM.
    ///
    /// Must be called from within a tokio runtime. The listener task ends
    /// when the signal is triggered by any other means.
    pub fn trigger_on_os_signals(&self) {
        let signal = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = wait_for_os_signal() => signal.trigger(),
                () = signal.recv() => {}
            }
        });
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

async fn wait_for_os_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                (Err(e), _) | (_, Err(e)) => {
                    tracing::warn!(error = %e, "failed to register signal handlers");
                    return std::future::pending().await;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => tracing::info!("received SIGTERM, stopping"),
            _ = sigint.recv() => tracing::info!("received SIGINT, stopping"),
        }
    }

    #[cfg(not(unix))]
    {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("received Ctrl+C, stopping"),
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Counts open connections.
///
/// # Example
///
/// ```rust
/// use pulsar_server::shutdown::ConnectionTracker;
///
/// let tracker = ConnectionTracker::new();
/// let token = tracker.acquire();
/// assert_eq!(tracker.active_connections(), 1);
///
/// drop(token);
/// assert_eq!(tracker.active_connections(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    active: Arc<AtomicUsize>,
    notify: Arc<Notify>,
}

impl ConnectionTracker {
    /// Creates a tracker with no connections.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection until the token is dropped.
    #[must_use]
    pub fn acquire(&self) -> ConnectionToken {
        self.active.fetch_add(1, Ordering::SeqCst);
        ConnectionToken {
            active: Arc::clone(&self.active),
            notify: Arc::clone(&self.notify),
        }
    }

    /// Number of open connections.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Waits until every token is dropped.
    pub async fn wait_for_idle(&self) {
        loop {
            let notified = self.notify.notified();
            if self.active.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// An open connection. Dropping it releases the slot.
#[derive(Debug)]
pub struct ConnectionToken {
    active: Arc<AtomicUsize>,
    notify: Arc<Notify>,
}

impl Drop for ConnectionToken {
    fn drop(&mut self) {
        if self.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.notify.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_test::{assert_pending, assert_ready, task};

    #[test]
    fn test_shutdown_signal_trigger_idempotent() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_shutdown());

        signal.trigger();
        signal.trigger();
        assert!(signal.is_shutdown());
    }

    #[test]
    fn test_shutdown_signal_clone_shares_state() {
        let signal = ShutdownSignal::default();
        let observer = signal.clone();

        signal.trigger();
        assert!(observer.is_shutdown());
    }

    #[test]
    fn test_recv_pending_until_triggered() {
        let signal = ShutdownSignal::new();
        let mut recv = task::spawn(signal.recv());

        assert_pending!(recv.poll());

        signal.trigger();
        assert!(recv.is_woken());
        assert_ready!(recv.poll());
    }

    #[test]
    fn test_recv_ready_if_already_triggered() {
        let signal = ShutdownSignal::new();
        signal.trigger();

        let mut recv = task::spawn(signal.recv());
        assert_ready!(recv.poll());
    }

    #[tokio::test]
    async fn test_os_listener_ends_with_signal() {
        let signal = ShutdownSignal::new();
        signal.trigger_on_os_signals();
        signal.trigger();

        tokio::time::timeout(Duration::from_secs(1), signal.recv())
            .await
            .expect("recv should complete");
    }

    #[test]
    fn test_connection_tracker_counts() {
        let tracker = ConnectionTracker::new();
        let first = tracker.acquire();
        let second = tracker.acquire();
        assert_eq!(tracker.active_connections(), 2);

        drop(first);
        assert_eq!(tracker.active_connections(), 1);
        drop(second);
        assert_eq!(tracker.active_connections(), 0);
    }

    #[test]
    fn test_wait_for_idle_immediate() {
        let tracker = ConnectionTracker::new();
        tokio_test::block_on(tracker.wait_for_idle());
    }

    #[tokio::test]
    async fn test_wait_for_idle_after_drop() {
        let tracker = ConnectionTracker::new();
        let token = tracker.acquire();

        let waiter = tokio::spawn({
            let tracker = tracker.clone();
            async move { tracker.wait_for_idle().await }
        });

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            drop(token);
        });

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("wait should complete")
            .expect("task should not panic");
    }
}
