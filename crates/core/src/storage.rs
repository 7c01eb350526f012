//! File storage collaborator used by the upload endpoint.
//!
//! [`FileStore`] is the seam; [`LocalFileStore`] writes uploads to a
//! directory on the local filesystem, one sub-directory per job.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::CoreError;
use crate::types::JobId;

/// Name used when an upload carries no usable file name.
pub const FALLBACK_FILE_NAME: &str = "upload.bin";

/// Reference to a persisted upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredFile {
    /// Where the bytes were written.
    pub path: PathBuf,
    /// Sanitized original file name.
    pub file_name: String,
    /// Size in bytes.
    pub size: u64,
}

/// Durable storage for uploaded files.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Persist `data` for `job_id`, returning a reference to the stored file.
    async fn store(
        &self,
        job_id: JobId,
        file_name: &str,
        data: &[u8],
    ) -> Result<StoredFile, CoreError>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}

/// Filesystem-backed [`FileStore`].
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn store(
        &self,
        job_id: JobId,
        file_name: &str,
        data: &[u8],
    ) -> Result<StoredFile, CoreError> {
        let file_name = sanitize_file_name(file_name);
        let dir = self.root.join(job_id.to_string());

        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            CoreError::Storage(format!("Failed to create {}: {e}", dir.display()))
        })?;

        let path = dir.join(&file_name);
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| CoreError::Storage(format!("Failed to write {}: {e}", path.display())))?;

        tracing::debug!(
            job_id = %job_id,
            path = %path.display(),
            size = data.len(),
            "Upload stored",
        );

        Ok(StoredFile {
            path,
            file_name,
            size: data.len() as u64,
        })
    }

    fn name(&self) -> &str {
        "local"
    }
}

/// Reduce a client-supplied file name to a single safe path component.
///
/// Directory parts are stripped, control characters dropped, and names
/// that would resolve to the directory itself fall back to
/// [`FALLBACK_FILE_NAME`].
pub fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        FALLBACK_FILE_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}
