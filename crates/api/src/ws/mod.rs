//! WebSocket progress streaming.
//!
//! Provides the connection registry, the event dispatcher that routes job
//! progress to it, per-connection keep-alive, and the HTTP upgrade handler
//! used by Axum routes.

pub mod dispatcher;
mod handler;
pub mod heartbeat;
pub mod registry;

pub use dispatcher::{Delivery, EventDispatcher};
pub use handler::ws_handler;
pub use heartbeat::KeepAlive;
pub use registry::{ConnectionHandle, ConnectionId, ConnectionRegistry, Outbound};
