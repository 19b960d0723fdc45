use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use subcast_protocol::{code, Message};
use tracing::warn;

use crate::error::{BrokerError, EnqueueError};
use crate::ring::RingBuffer;
use crate::subscriber::Subscriber;

#[derive(Debug, Default)]
struct TopicState {
    subscribers: HashMap<String, Arc<Subscriber>>,
    published: u64,
}

/// A named channel: subscriber set, replay ring buffer, publish counter.
///
/// The subscriber map and the counter share one RwLock. Publish performs the
/// ring append, the counter increment, and the fan-out under the write guard,
/// so the order messages land in the ring is exactly the order every
/// subscriber observes. Eviction of one subscriber never blocks or skips
/// delivery to another: enqueue is non-blocking and failed subscribers are
/// collected and closed after the loop.
#[derive(Debug)]
pub struct Topic {
    name: String,
    history: RingBuffer,
    state: RwLock<TopicState>,
}

impl Topic {
    pub fn new(name: impl Into<String>, history_capacity: usize) -> Self {
        Self {
            name: name.into(),
            history: RingBuffer::new(history_capacity),
            state: RwLock::new(TopicState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.read().unwrap().subscribers.len()
    }

    /// Messages accepted by this topic since creation.
    pub fn message_count(&self) -> u64 {
        self.state.read().unwrap().published
    }

    /// Insert the subscriber under its client id, replacing (and closing) any
    /// existing binding, with no replay.
    pub fn register(&self, sub: Arc<Subscriber>) {
        // Replay of zero cannot overflow.
        let _ = self.subscribe(sub, 0);
    }

    /// Insert the subscriber and enqueue up to `replay` recent messages from
    /// the ring buffer, atomically with respect to concurrent publishes, so
    /// replayed messages always precede live ones in the subscriber's queue.
    ///
    /// An existing binding for the same client id is closed before the new
    /// one becomes visible. Replay uses the same non-blocking enqueue as live
    /// fan-out: overflow closes the new subscriber with `SLOW_CONSUMER` and
    /// leaves it unregistered.
    pub fn subscribe(&self, sub: Arc<Subscriber>, replay: usize) -> Result<(), BrokerError> {
        let mut state = self.state.write().unwrap();
        if let Some(old) = state.subscribers.remove(sub.client_id()) {
            old.close();
        }
        for message in self.history.last_n(replay) {
            if sub.enqueue(message).is_err() {
                sub.close_with_error(code::SLOW_CONSUMER, "replay overflow");
                return Err(BrokerError::SlowConsumer);
            }
        }
        state.subscribers.insert(sub.client_id().to_string(), sub);
        Ok(())
    }

    /// Remove and close the subscriber registered under `client_id`.
    /// Idempotent; a missing binding is a no-op.
    pub fn unregister(&self, client_id: &str) {
        let removed = self.state.write().unwrap().subscribers.remove(client_id);
        if let Some(sub) = removed {
            sub.close();
        }
    }

    /// Remove `sub` only if it is still the registered binding for its client
    /// id. Used on session exit so a binding already replaced by another
    /// session is left alone. The given subscriber is closed either way.
    pub fn remove_subscriber(&self, sub: &Arc<Subscriber>) {
        {
            let mut state = self.state.write().unwrap();
            if let Some(current) = state.subscribers.get(sub.client_id()) {
                if Arc::ptr_eq(current, sub) {
                    state.subscribers.remove(sub.client_id());
                }
            }
        }
        sub.close();
    }

    /// Record the message in the ring buffer, bump the counter, and enqueue
    /// it to every registered subscriber. A subscriber whose queue is full is
    /// evicted with `SLOW_CONSUMER` before this call returns; one whose
    /// writer already closed is dropped silently.
    pub fn publish(&self, message: Message) {
        let mut evicted: Vec<(Arc<Subscriber>, EnqueueError)> = Vec::new();
        {
            let mut state = self.state.write().unwrap();
            self.history.add(message.clone());
            state.published += 1;
            state.subscribers.retain(|_, sub| match sub.enqueue(message.clone()) {
                Ok(()) => true,
                Err(reason) => {
                    evicted.push((Arc::clone(sub), reason));
                    false
                }
            });
        }
        for (sub, reason) in evicted {
            match reason {
                EnqueueError::Full => {
                    warn!(
                        topic = %self.name,
                        client_id = %sub.client_id(),
                        "disconnecting slow consumer"
                    );
                    sub.close_with_error(code::SLOW_CONSUMER, "subscriber queue overflow");
                }
                EnqueueError::Closed => sub.close(),
            }
        }
    }

    /// Up to `n` most recent messages, oldest first.
    pub fn replay(&self, n: usize) -> Vec<Message> {
        self.history.last_n(n)
    }

    /// Disconnect and drop every subscriber. Used by topic deletion and
    /// shutdown; the subscribers' sockets observe the closure.
    pub fn close_subscribers(&self) {
        let drained: Vec<_> = {
            let mut state = self.state.write().unwrap();
            state.subscribers.drain().map(|(_, sub)| sub).collect()
        };
        for sub in drained {
            sub.disconnect();
        }
    }

    /// Snapshot of the current subscribers, for shutdown orchestration.
    pub(crate) fn subscribers_snapshot(&self) -> Vec<Arc<Subscriber>> {
        self.state
            .read()
            .unwrap()
            .subscribers
            .values()
            .cloned()
            .collect()
    }
}
