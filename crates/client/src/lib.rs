//! Demo client for the docflow server.
//!
//! Opens the progress stream for a client id, uploads one file and follows
//! the job's events until the terminal one arrives.

pub mod client;
pub mod error;

pub use client::{DocflowClient, ProgressStream, UploadResponse, DEFAULT_PING_INTERVAL, KEEPALIVE_TEXT};
pub use error::ClientError;
