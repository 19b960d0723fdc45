use std::sync::Arc;
use std::sync::Mutex;

use subcast_client::{CloseSignal, Connection};
use subcast_protocol::{Message, ServerFrame};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::EnqueueError;

/// One client's handle on one topic.
///
/// A subscriber owns a bounded message queue and exactly one writer task that
/// drains the queue into the owning connection as `event` frames. Enqueue
/// never blocks: a full queue is the overflow signal the caller reacts to by
/// evicting the subscriber.
///
/// Lifecycle: the close signal is authoritative. After it fires, enqueues
/// fail and the writer exits; whether the owning socket is shut down too is
/// the caller's call (`close` keeps it, `disconnect` does not). Close is
/// idempotent no matter how many of the holders (topic, session, writer)
/// invoke it.
#[derive(Debug)]
pub struct Subscriber {
    client_id: String,
    topic: String,
    /// Sender half of the bounded queue. Taken on close (hard stop) and on
    /// drain (graceful stop), after which enqueues report `Closed`.
    queue: Mutex<Option<mpsc::Sender<Message>>>,
    conn: Connection,
    closed: CloseSignal,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl Subscriber {
    /// Create the subscriber and start its writer task.
    pub fn spawn(
        client_id: impl Into<String>,
        topic: impl Into<String>,
        queue_capacity: usize,
        conn: Connection,
    ) -> Arc<Self> {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let sub = Arc::new(Self {
            client_id: client_id.into(),
            topic: topic.into(),
            queue: Mutex::new(Some(tx)),
            conn,
            closed: CloseSignal::new(),
            writer: Mutex::new(None),
        });
        let handle = tokio::spawn(write_loop(Arc::clone(&sub), rx));
        *sub.writer.lock().unwrap() = Some(handle);
        sub
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Non-blocking enqueue. `Full` means the caller must evict this
    /// subscriber; `Closed` means it is already gone and should be dropped
    /// from any map still referencing it.
    pub fn enqueue(&self, message: Message) -> Result<(), EnqueueError> {
        let guard = self.queue.lock().unwrap();
        let Some(tx) = guard.as_ref() else {
            return Err(EnqueueError::Closed);
        };
        tx.try_send(message).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => EnqueueError::Full,
            mpsc::error::TrySendError::Closed(_) => EnqueueError::Closed,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_closed()
    }

    /// Resolves once the subscriber has been closed.
    pub async fn closed(&self) {
        self.closed.closed().await;
    }

    /// Fire the close signal, stop accepting enqueues, and stop the writer.
    /// The owning socket stays open: a session that unsubscribes one topic
    /// keeps its other subscriptions. Idempotent.
    pub fn close(&self) {
        if !self.closed.close() {
            return;
        }
        self.queue.lock().unwrap().take();
        debug!(topic = %self.topic, client_id = %self.client_id, "subscriber closed");
    }

    /// Close the subscriber and shut the owning socket. Used when the
    /// subscriber's end is terminal for the whole connection: eviction,
    /// topic deletion, shutdown.
    pub fn disconnect(&self) {
        self.close();
        self.conn.close();
    }

    /// Best-effort error frame to the socket, then close subscriber and
    /// socket both.
    pub fn close_with_error(&self, code: &str, reason: &str) {
        if !self.is_closed() {
            let _ = self
                .conn
                .try_send(ServerFrame::error(None, code, reason));
        }
        self.disconnect();
    }

    /// Stop accepting enqueues but let the writer flush whatever is already
    /// queued. Part of graceful shutdown; a later `close` still hard-stops.
    pub fn begin_drain(&self) {
        self.queue.lock().unwrap().take();
    }

    /// Graceful close: drain the queue until `deadline`, then hard close.
    pub async fn close_gracefully(&self, deadline: tokio::time::Instant) {
        self.begin_drain();
        let handle = self.writer.lock().unwrap().take();
        if let Some(handle) = handle {
            // Timing out drops the handle, which detaches (not aborts) the
            // writer; the disconnect below unblocks it through the
            // connection.
            let _ = tokio::time::timeout_at(deadline, handle).await;
        }
        self.disconnect();
    }
}

/// Drains the queue into the connection as `event` frames.
///
/// Exits on queue closure (drain), on the close signal (hard stop), or on a
/// connection failure, in which case it closes the subscriber itself so the
/// topic drops it on the next fan-out.
async fn write_loop(sub: Arc<Subscriber>, mut queue: mpsc::Receiver<Message>) {
    loop {
        tokio::select! {
            biased;
            _ = sub.closed.closed() => break,
            next = queue.recv() => match next {
                None => break,
                Some(message) => {
                    let frame = ServerFrame::event(sub.topic(), message);
                    if sub.conn.send(frame).await.is_err() {
                        debug!(
                            topic = %sub.topic,
                            client_id = %sub.client_id,
                            "connection lost, closing subscriber"
                        );
                        sub.close();
                        break;
                    }
                }
            }
        }
    }
}
