use std::sync::Arc;

use docflow_core::storage::{FileStore, LocalFileStore};
use docflow_pipeline::JobRunner;

use crate::config::ServerConfig;
use crate::ws::{ConnectionRegistry, EventDispatcher};

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Live stream connections keyed by client id.
    pub registry: Arc<ConnectionRegistry>,
    /// Runs uploaded files through the processing stages.
    pub job_runner: Arc<JobRunner>,
    /// Where uploads are persisted before processing.
    pub file_store: Arc<dyn FileStore>,
}

impl AppState {
    /// Wire up state with a [`LocalFileStore`] rooted at `config.upload_dir`.
    pub fn new(config: ServerConfig) -> Self {
        let store = Arc::new(LocalFileStore::new(config.upload_dir.clone()));
        Self::with_file_store(config, store)
    }

    /// Wire up state around a caller-supplied storage collaborator.
    pub fn with_file_store(config: ServerConfig, file_store: Arc<dyn FileStore>) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let dispatcher = Arc::new(EventDispatcher::new(Arc::clone(&registry)));
        let job_runner = Arc::new(
            JobRunner::simulated(dispatcher, &config.simulation)
                .with_max_duration(config.job_timeout()),
        );

        Self {
            config: Arc::new(config),
            registry,
            job_runner,
            file_store,
        }
    }
}
