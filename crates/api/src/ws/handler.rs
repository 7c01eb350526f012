use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::ws::{close_code, CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use docflow_core::types::ClientId;
use futures::{SinkExt, StreamExt};
use tokio::time::Instant;

use crate::error::AppResult;
use crate::state::AppState;
use crate::ws::heartbeat::KeepAlive;
use crate::ws::registry::{ConnectionRegistry, Outbound};

/// Why a stream session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    /// The terminal progress event was written.
    Terminal,
    /// A newer connection registered under the same client id, or the
    /// server is shutting down.
    Closed,
    /// The client closed the socket or a read/write failed.
    Disconnected,
    /// Nothing heard from the client within the idle timeout.
    Idle,
}

impl SessionEnd {
    fn as_str(self) -> &'static str {
        match self {
            Self::Terminal => "terminal",
            Self::Closed => "closed",
            Self::Disconnected => "disconnected",
            Self::Idle => "idle",
        }
    }
}

/// GET /ws/{client_id}
///
/// Upgrades the connection to a WebSocket that streams progress events for
/// `client_id`. The id is validated before the upgrade.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(client_id): Path<String>,
    State(state): State<AppState>,
) -> AppResult<Response> {
    let client_id = ClientId::parse(client_id)?;
    let keepalive = KeepAlive::from_config(&state.config);
    let registry = state.registry;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, client_id, registry, keepalive)))
}

/// Manage a single stream connection after upgrade.
///
/// Registers the connection, then selects over outbound frames from the
/// registry, the keep-alive timer and inbound frames until the session
/// ends. Always removes its own registration on the way out.
async fn handle_socket(
    socket: WebSocket,
    client_id: ClientId,
    registry: Arc<ConnectionRegistry>,
    keepalive: KeepAlive,
) {
    let (conn_id, mut rx) = registry.register(client_id.clone()).await;
    tracing::info!(client_id = %client_id, conn_id = %conn_id, "Stream connected");

    let (mut sink, mut stream) = socket.split();
    let mut ticker = keepalive.ticker();
    let mut last_seen = Instant::now();

    let end = loop {
        tokio::select! {
            biased;

            outbound = rx.recv() => match outbound {
                Some(Outbound::Event { json, terminal }) => {
                    if sink.send(Message::Text(json.into())).await.is_err() {
                        break SessionEnd::Disconnected;
                    }
                    if terminal {
                        let _ = sink
                            .send(close_message(close_code::NORMAL, "processing finished"))
                            .await;
                        break SessionEnd::Terminal;
                    }
                }
                Some(Outbound::Close) | None => {
                    let _ = sink.send(close_message(close_code::AWAY, "connection closed")).await;
                    break SessionEnd::Closed;
                }
            },

            inbound = stream.next() => match inbound {
                Some(Ok(Message::Close(_))) | None => break SessionEnd::Disconnected,
                Some(Ok(_)) => {
                    // Client keep-alives and pongs only refresh liveness.
                    last_seen = Instant::now();
                    tracing::trace!(conn_id = %conn_id, "Keep-alive received");
                }
                Some(Err(e)) => {
                    tracing::debug!(conn_id = %conn_id, error = %e, "Stream receive error");
                    break SessionEnd::Disconnected;
                }
            },

            _ = ticker.tick() => {
                if keepalive.is_expired(last_seen) {
                    let _ = sink.send(close_message(close_code::AWAY, "idle timeout")).await;
                    break SessionEnd::Idle;
                }
                if sink.send(Message::Ping(Bytes::new())).await.is_err() {
                    break SessionEnd::Disconnected;
                }
            }
        }
    };

    registry.remove_connection(&client_id, conn_id).await;
    tracing::info!(
        client_id = %client_id,
        conn_id = %conn_id,
        reason = end.as_str(),
        "Stream closed",
    );
}

fn close_message(code: u16, reason: &'static str) -> Message {
    Message::Close(Some(CloseFrame {
        code,
        reason: Utf8Bytes::from_static(reason),
    }))
}
