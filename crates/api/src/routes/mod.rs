pub mod health;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the upload and streaming route tree.
///
/// ```text
/// /upload/{client_id}     POST multipart upload (field `file`)
/// /ws/{client_id}         WebSocket progress stream
/// /stream/{client_id}     alias of /ws/{client_id}
/// ```
///
/// `max_upload_bytes` bounds the upload body; larger bodies get 413.
pub fn api_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/upload/{client_id}",
            post(handlers::upload::upload_file).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/ws/{client_id}", get(ws::ws_handler))
        .route("/stream/{client_id}", get(ws::ws_handler))
}
