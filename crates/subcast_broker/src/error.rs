//! Error types for broker operations.

use subcast_protocol::code;
use thiserror::Error;

/// Failures surfaced by registry and topic operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BrokerError {
    #[error("topic already exists")]
    TopicExists,

    #[error("topic not found")]
    TopicNotFound,

    #[error("subscriber queue overflow")]
    SlowConsumer,
}

impl BrokerError {
    /// The protocol error code carried on the wire for this failure.
    pub fn wire_code(&self) -> &'static str {
        match self {
            BrokerError::TopicExists => code::TOPIC_EXISTS,
            BrokerError::TopicNotFound => code::TOPIC_NOT_FOUND,
            BrokerError::SlowConsumer => code::SLOW_CONSUMER,
        }
    }
}

/// Why a non-blocking enqueue did not accept a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EnqueueError {
    /// The bounded queue is at capacity. The caller must evict the
    /// subscriber; this is the sole overflow signal.
    #[error("queue full")]
    Full,

    /// The subscriber has been closed; no further enqueues can succeed.
    #[error("subscriber closed")]
    Closed,
}
