#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use docflow_api::config::ServerConfig;
use docflow_api::router::build_app_router;
use docflow_api::state::AppState;
use docflow_core::types::ClientId;
use docflow_pipeline::SimulationConfig;
use http_body_util::BodyExt;
use tower::ServiceExt;

/// Boundary used by [`multipart_body`].
pub const BOUNDARY: &str = "docflow-test-boundary";

/// Build a test `ServerConfig` with safe defaults and instant stages.
pub fn test_config(upload_dir: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        upload_dir: upload_dir.to_path_buf(),
        max_upload_bytes: 1024,
        ws_ping_interval_secs: 10,
        ws_idle_timeout_secs: 60,
        job_timeout_secs: 30,
        simulation: SimulationConfig::instant(3),
    }
}

/// Build the full application router over `state`.
pub fn build_test_app(state: AppState) -> Router {
    build_app_router(state)
}

pub fn client(id: &str) -> ClientId {
    ClientId::parse(id).unwrap()
}

/// Encode a single-field `multipart/form-data` body.
pub fn multipart_body(field: &str, file_name: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// POST a multipart body to `uri` through the router.
pub async fn post_multipart(app: Router, uri: &str, body: Vec<u8>) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Serve `app` on an ephemeral localhost port.
pub async fn spawn_server(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Poll `check` until it returns true or five seconds pass.
pub async fn wait_until<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// Wait until every job has released its in-flight slot.
pub async fn wait_for_jobs(state: &AppState) -> bool {
    let runner = state.job_runner.clone();
    wait_until(|| {
        let runner = runner.clone();
        async move { runner.in_flight().is_empty() }
    })
    .await
}
