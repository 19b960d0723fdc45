//! subcast_server
//!
//! The network surface: one axum router serving the topic CRUD and
//! observability endpoints plus the `/ws` upgrade, the per-connection
//! session (reader, dispatcher, send loop, heartbeat), the shared-secret
//! API-key gate, CORS, and request tracing.
//!
//! Responsibilities:
//! - Translate protocol frames into broker operations and replies
//! - Keep the per-session subscription table so every subscriber a session
//!   created is torn down when the socket goes away
//! - Serialize all outbound frames for a connection through its send loop so
//!   no frame is cut short by per-request cancellation

pub mod http;
pub mod middleware;
pub mod session;
pub mod state;
pub mod websocket;

pub use http::build_router;
pub use state::AppState;

#[cfg(test)]
mod tests;
