//! Router assembly for the docflow server.
//!
//! [`build_app_router`] is the single place where routes meet middleware;
//! `main.rs` serves its output and the integration tests drive it directly.

use std::time::Duration;

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, Method, StatusCode};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::routes;
use crate::state::AppState;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Mount `/health`, `/upload/{client_id}` and the stream endpoints
/// (`/ws/{client_id}`, `/stream/{client_id}`) behind the shared middleware.
///
/// Layers run outermost first: CORS, request id assignment, request
/// tracing, request id echo on the response, request timeout, and panic
/// recovery closest to the handlers. The timeout covers the HTTP exchange
/// only; an upgraded stream and a spawned job both outlive it.
pub fn build_app_router(state: AppState) -> Router {
    let config = state.config.clone();
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    let middleware = ServiceBuilder::new()
        .layer(build_cors_layer(&config.cors_origins))
        .map_response(|res: axum::response::Response<_>| res.map(axum::body::Body::new))
        .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(PropagateRequestIdLayer::new(request_id))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_secs),
        ))
        .layer(CatchPanicLayer::new());

    Router::new()
        .merge(routes::health::router())
        .merge(routes::api_routes(config.max_upload_bytes))
        .layer(middleware)
        .with_state(state)
}

/// CORS for browser clients: the configured origins may `GET` (health and
/// stream upgrades) and `POST` multipart uploads.
///
/// An unparsable origin panics; this only runs at startup.
pub fn build_cors_layer(cors_origins: &[String]) -> CorsLayer {
    let origins: Vec<_> = cors_origins
        .iter()
        .map(|o| {
            o.parse()
                .unwrap_or_else(|e| panic!("Invalid CORS origin '{o}': {e}"))
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(3600))
}
