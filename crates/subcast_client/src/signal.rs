use std::sync::Arc;

use tokio::sync::watch;

/// A one-shot, idempotent close signal with any number of waiters.
///
/// Both the subscriber lifecycle and the connection shutdown use this as the
/// single authoritative "closed" notification: once fired it stays fired,
/// every `closed().await` completes, and late subscribers observe the state
/// through `is_closed()`.
#[derive(Debug, Clone)]
pub struct CloseSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl CloseSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Fire the signal. Returns `true` only for the call that actually
    /// closed it, which lets callers run teardown exactly once.
    pub fn close(&self) -> bool {
        !self.tx.send_replace(true)
    }

    pub fn is_closed(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once the signal has fired. Resolves immediately if it already
    /// has.
    pub async fn closed(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives inside self, so wait_for cannot observe a drop.
        let _ = rx.wait_for(|closed| *closed).await;
    }
}

impl Default for CloseSignal {
    fn default() -> Self {
        Self::new()
    }
}
