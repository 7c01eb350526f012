use std::net::SocketAddr;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docflow_api::config::ServerConfig;
use docflow_api::router::build_app_router;
use docflow_api::state::AppState;

/// How often shutdown re-checks for running jobs.
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(200);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "docflow_api=debug,docflow_pipeline=debug,docflow_core=debug,tower_http=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = config.port,
        upload_dir = %config.upload_dir.display(),
        pages = config.simulation.pages,
        "Loaded server configuration",
    );

    // --- App state (registry, dispatcher, job runner, file store) ---
    let state = AppState::new(config.clone());
    let registry = state.registry.clone();
    let job_runner = state.job_runner.clone();

    // --- Router ---
    let app = build_app_router(state);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    let ws_count = registry.connection_count().await;
    tracing::info!(ws_count, "Closing remaining stream connections");
    registry.shutdown_all().await;

    let drained = tokio::time::timeout(config.shutdown_timeout(), async {
        while !job_runner.in_flight().is_empty() {
            tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
        }
    })
    .await;
    match drained {
        Ok(()) => tracing::info!("All jobs finished"),
        Err(_) => tracing::warn!(
            remaining = job_runner.in_flight().len(),
            "Shutdown timeout reached with jobs still running",
        ),
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
