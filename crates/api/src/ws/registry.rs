use std::collections::HashMap;

use docflow_core::types::ClientId;
use tokio::sync::{mpsc, RwLock};

/// Server-generated identity of one stream connection.
///
/// Distinguishes successive connections registered under the same
/// [`ClientId`], so a replaced connection's cleanup never removes its
/// successor.
pub type ConnectionId = uuid::Uuid;

/// Frame queued for a stream connection's task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// A serialized progress event. `terminal` marks the last frame of the
    /// session: the connection closes after writing it.
    Event { json: String, terminal: bool },
    /// Close the connection without further events.
    Close,
}

/// Channel sender half for pushing frames to a stream connection.
pub type OutboundSender = mpsc::UnboundedSender<Outbound>;

/// Registry entry for a single live connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub conn_id: ConnectionId,
    /// Channel sender for outbound frames to this connection.
    pub sender: OutboundSender,
}

/// Maps each client id to its live stream connection.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared between the stream endpoint and the event dispatcher. No lock is
/// held beyond a single operation.
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ClientId, ConnectionHandle>>,
}

impl ConnectionRegistry {
    /// Create a new, empty registry.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new connection for `client_id`.
    ///
    /// Any connection previously registered under the same id is replaced
    /// and sent [`Outbound::Close`]. Returns the new connection's id and the
    /// receiver half of its outbound channel.
    pub async fn register(
        &self,
        client_id: ClientId,
    ) -> (ConnectionId, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = ConnectionHandle {
            conn_id: uuid::Uuid::new_v4(),
            sender: tx,
        };
        let conn_id = handle.conn_id;

        let previous = self
            .connections
            .write()
            .await
            .insert(client_id.clone(), handle);

        if let Some(previous) = previous {
            tracing::info!(
                client_id = %client_id,
                old_conn_id = %previous.conn_id,
                new_conn_id = %conn_id,
                "Replacing existing stream connection",
            );
            let _ = previous.sender.send(Outbound::Close);
        }

        (conn_id, rx)
    }

    /// Look up the live connection for `client_id`.
    pub async fn lookup(&self, client_id: &ClientId) -> Option<ConnectionHandle> {
        self.connections.read().await.get(client_id).cloned()
    }

    /// Remove whatever connection is registered for `client_id`.
    ///
    /// Removing an absent id is a no-op.
    pub async fn remove(&self, client_id: &ClientId) {
        self.connections.write().await.remove(client_id);
    }

    /// Remove the registration for `client_id` only if it still belongs to
    /// `conn_id`. Returns whether an entry was removed.
    pub async fn remove_connection(&self, client_id: &ClientId, conn_id: ConnectionId) -> bool {
        let mut conns = self.connections.write().await;
        match conns.get(client_id) {
            Some(handle) if handle.conn_id == conn_id => {
                conns.remove(client_id);
                true
            }
            _ => false,
        }
    }

    /// Return the current number of registered connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Send [`Outbound::Close`] to every connection, then clear the map.
    ///
    /// Used during graceful shutdown.
    pub async fn shutdown_all(&self) {
        let mut conns = self.connections.write().await;
        let count = conns.len();
        for handle in conns.values() {
            let _ = handle.sender.send(Outbound::Close);
        }
        conns.clear();
        tracing::info!(count, "Closed all stream connections");
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
