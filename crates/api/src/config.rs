use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use docflow_pipeline::SimulationConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for in-flight jobs, in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Directory uploads are written to (default: `./uploads`).
    pub upload_dir: PathBuf,
    /// Maximum accepted upload body size in bytes (default: 50 MiB).
    pub max_upload_bytes: usize,
    /// Interval between server keep-alive pings on stream connections.
    pub ws_ping_interval_secs: u64,
    /// A stream connection silent for longer than this is dropped.
    pub ws_idle_timeout_secs: u64,
    /// Maximum lifetime of one processing job (default: `600`).
    pub job_timeout_secs: u64,
    /// Delays and page count of the simulated processing stages.
    pub simulation: SimulationConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                    |
    /// |-------------------------|----------------------------|
    /// | `HOST`                  | `0.0.0.0`                  |
    /// | `PORT`                  | `8000`                     |
    /// | `CORS_ORIGINS`          | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`                       |
    /// | `UPLOAD_DIR`            | `./uploads`                |
    /// | `MAX_UPLOAD_BYTES`      | `52428800`                 |
    /// | `WS_PING_INTERVAL_SECS` | `10`                       |
    /// | `WS_IDLE_TIMEOUT_SECS`  | `60`                       |
    /// | `JOB_TIMEOUT_SECS`      | `600`                      |
    ///
    /// Simulation settings are read by [`SimulationConfig::from_env`].
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let upload_dir = std::env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./uploads"));

        Self {
            host,
            port: env_parse("PORT", 8000),
            cors_origins,
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", 30),
            shutdown_timeout_secs: env_parse("SHUTDOWN_TIMEOUT_SECS", 30),
            upload_dir,
            max_upload_bytes: env_parse("MAX_UPLOAD_BYTES", 50 * 1024 * 1024),
            ws_ping_interval_secs: env_parse("WS_PING_INTERVAL_SECS", 10),
            ws_idle_timeout_secs: env_parse("WS_IDLE_TIMEOUT_SECS", 60),
            job_timeout_secs: env_parse("JOB_TIMEOUT_SECS", 600),
            simulation: SimulationConfig::from_env(),
        }
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Read `key` and parse it, falling back to `default` when unset.
///
/// Panics on an unparsable value: misconfiguration should fail fast at
/// startup.
fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a valid {}", std::any::type_name::<T>())),
        Err(_) => default,
    }
}
