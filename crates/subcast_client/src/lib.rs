//! subcast_client
//!
//! The per-connection write path shared by the broker and the server. A
//! [`Connection`] is a cheap clone-able handle holding the sending side of a
//! bounded frame channel; the server's send loop owns the receiving side and
//! the actual socket sink. Subscriber writer tasks, the session dispatcher,
//! and the heartbeat all write through the same handle, so frames are
//! serialized onto the wire in send order and a frame is never torn by
//! session-level cancellation.

pub mod connection;
pub mod signal;

pub use connection::{Connection, ConnectionClosed};
pub use signal::CloseSignal;
