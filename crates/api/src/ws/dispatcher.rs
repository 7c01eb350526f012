//! Best-effort delivery of progress events to stream connections.

use std::sync::Arc;

use async_trait::async_trait;
use docflow_core::progress::ProgressEvent;
use docflow_core::types::ClientId;
use docflow_pipeline::ProgressSink;

use crate::ws::registry::{ConnectionRegistry, Outbound};

/// Result of a single delivery attempt. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Queued on the client's live connection.
    Delivered,
    /// No connection registered for the client; event discarded.
    NoRecipient,
    /// The connection was gone or the event could not be encoded;
    /// event discarded.
    Dropped,
}

/// Routes progress events to the connection registered for their client.
///
/// At-most-once: events for clients without a live connection are
/// discarded and never replayed.
pub struct EventDispatcher {
    registry: Arc<ConnectionRegistry>,
}

impl EventDispatcher {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Deliver `event` to `client_id`'s connection, if any.
    ///
    /// A failed write means the connection task has ended; its registration
    /// is removed and the event dropped. Never fails.
    pub async fn deliver(&self, client_id: &ClientId, event: &ProgressEvent) -> Delivery {
        let Some(conn) = self.registry.lookup(client_id).await else {
            tracing::trace!(
                client_id = %client_id,
                stage = event.stage.as_str(),
                "No stream connection; event discarded",
            );
            return Delivery::NoRecipient;
        };

        let json = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(client_id = %client_id, error = %e, "Failed to encode progress event");
                return Delivery::Dropped;
            }
        };

        let frame = Outbound::Event {
            json,
            terminal: event.is_terminal(),
        };

        if conn.sender.send(frame).is_err() {
            self.registry
                .remove_connection(client_id, conn.conn_id)
                .await;
            tracing::debug!(
                client_id = %client_id,
                conn_id = %conn.conn_id,
                "Stream connection gone; removed and event dropped",
            );
            return Delivery::Dropped;
        }

        Delivery::Delivered
    }
}

#[async_trait]
impl ProgressSink for EventDispatcher {
    async fn publish(&self, client_id: &ClientId, event: ProgressEvent) {
        self.deliver(client_id, &event).await;
    }
}
