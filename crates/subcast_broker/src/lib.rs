//! subcast_broker
//!
//! The concurrent topic/subscriber fabric: per-topic fan-out, bounded
//! subscriber queues with deterministic slow-consumer eviction, the bounded
//! replay ring buffer, and the process-wide topic registry.
//!
//! Concurrency and usage notes:
//! - The public API is synchronous and never blocks on a subscriber: enqueue
//!   either succeeds or fails immediately, so a publish can be issued from a
//!   session task without a fan-out thread in between. Only the subscriber
//!   writer loop and graceful shutdown are async.
//! - Every topic guards its subscriber map and publish counter with one
//!   RwLock; the ring-buffer append and the fan-out happen under the same
//!   write guard, which is what makes per-topic delivery order equal ring
//!   insertion order.
//! - A subscriber is shared between its topic (which enqueues into it) and
//!   its session (which owns the socket and ultimately closes it). The
//!   subscriber's close signal is the single authoritative lifecycle
//!   notification for both sides.

pub mod error;
pub mod registry;
pub mod ring;
pub mod subscriber;
pub mod topic;

pub use error::{BrokerError, EnqueueError};
pub use registry::{HealthSnapshot, Registry, StatsSnapshot, TopicStats, TopicSummary};
pub use ring::RingBuffer;
pub use subscriber::Subscriber;
pub use topic::Topic;
