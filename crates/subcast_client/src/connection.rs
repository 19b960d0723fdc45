use subcast_protocol::ServerFrame;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::signal::CloseSignal;

#[derive(Debug, Error)]
#[error("connection closed")]
pub struct ConnectionClosed;

/// Handle to one socket's outbound path.
///
/// The receiving half returned by [`Connection::new`] is consumed by the
/// server's send loop, which owns the WebSocket sink. The channel is bounded:
/// a client that stops reading eventually backpressures `send`, which is what
/// lets subscriber queues overflow and trigger eviction instead of buffering
/// without limit.
#[derive(Debug, Clone)]
pub struct Connection {
    id: String,
    out: mpsc::Sender<ServerFrame>,
    shutdown: CloseSignal,
}

impl Connection {
    pub fn new(outbound_capacity: usize) -> (Self, mpsc::Receiver<ServerFrame>) {
        let (out, rx) = mpsc::channel(outbound_capacity.max(1));
        let conn = Self {
            id: Uuid::new_v4().to_string(),
            out,
            shutdown: CloseSignal::new(),
        };
        (conn, rx)
    }

    /// Opaque connection identifier, used in logs.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Queue a frame for the socket, waiting for channel capacity. Fails once
    /// the connection is closed or the send loop has exited; a close fired
    /// while waiting wakes the caller instead of leaving it parked.
    pub async fn send(&self, frame: ServerFrame) -> Result<(), ConnectionClosed> {
        if self.shutdown.is_closed() {
            return Err(ConnectionClosed);
        }
        tokio::select! {
            _ = self.shutdown.closed() => Err(ConnectionClosed),
            sent = self.out.send(frame) => sent.map_err(|_| ConnectionClosed),
        }
    }

    /// Best-effort, non-blocking send. Returns whether the frame was queued;
    /// a full channel or a closed connection drops the frame.
    pub fn try_send(&self, frame: ServerFrame) -> bool {
        if self.shutdown.is_closed() {
            return false;
        }
        self.out.try_send(frame).is_ok()
    }

    /// Ask the send loop to stop and close the socket. Idempotent.
    pub fn close(&self) {
        self.shutdown.close();
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_closed()
    }

    /// Resolves when `close` has been called (by anyone holding a clone).
    pub async fn closed(&self) {
        self.shutdown.closed().await;
    }
}
