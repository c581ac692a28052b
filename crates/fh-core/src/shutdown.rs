//! Shutdown — cooperative cancellation for long-running tasks
//!
//! A `watch` channel carries a single "stop requested" flag. Any number of
//! waiters can race a sleep against it; once set it stays set.

use std::time::Duration;

use tokio::sync::watch;

use crate::error::{FirehoseError, FirehoseResult};

/// Cloneable shutdown handle
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
    rx: watch::Receiver<bool>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    /// Create a handle in the running state
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx, rx }
    }

    /// Request shutdown; wakes every waiter
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Whether shutdown has been requested
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown has been requested
    pub async fn triggered(&self) {
        let mut rx = self.rx.clone();
        // The sender lives in `self`, so `wait_for` cannot observe a closed channel.
        let _ = rx.wait_for(|stop| *stop).await;
    }

    /// Sleep for `duration` unless shutdown is requested first.
    ///
    /// An interrupted sleep returns [`FirehoseError::Cancelled`] naming `what`.
    pub async fn sleep(&self, duration: Duration, what: &str) -> FirehoseResult<()> {
        if self.is_triggered() {
            return Err(FirehoseError::Cancelled(format!("{what} interrupted")));
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = self.triggered() => {
                log::warn!("[Shutdown] {} interrupted", what);
                Err(FirehoseError::Cancelled(format!("{what} interrupted")))
            }
        }
    }
}
