//! subcast_protocol
//!
//! Wire types for the subcast JSON protocol. Every WebSocket frame is a
//! single JSON object; `ClientFrame` is the shape read from clients and
//! `ServerFrame` the shape written back. `Message` is the unit of publish:
//! an opaque identifier plus a free-form JSON payload, never interpreted or
//! mutated by the broker.
//!
//! The frame structs are deliberately flat with optional fields (rather than
//! a tagged enum) so that a request's `request_id` can be echoed on the
//! error reply even when the `type` is unknown or the rest of the frame is
//! incomplete.

pub mod frame;
pub mod message;

pub use frame::{code, ClientFrame, ErrorBody, FrameKind, ServerFrame};
pub use message::Message;
