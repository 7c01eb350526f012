//! Handler for the `/upload/{client_id}` endpoint.

use axum::body::Bytes;
use axum::extract::{Multipart, Path, State};
use axum::Json;
use docflow_core::error::CoreError;
use docflow_core::storage::FALLBACK_FILE_NAME;
use docflow_core::types::{ClientId, JobId};
use docflow_pipeline::Job;
use serde::Serialize;

use crate::error::AppResult;
use crate::state::AppState;

/// Multipart field carrying the file.
pub const FILE_FIELD: &str = "file";

/// Acknowledgement message returned on accept.
pub const MSG_ACCEPTED: &str = "File received. Processing started.";

/// Response body for an accepted upload.
#[derive(Debug, Serialize)]
pub struct UploadAccepted {
    pub message: &'static str,
    pub job_id: JobId,
}

/// A file read from the multipart body.
struct FilePart {
    file_name: String,
    data: Bytes,
}

/// POST /upload/{client_id}
///
/// Persist the uploaded file, then start processing it in the background.
/// Returns as soon as the job is spawned; progress is pushed over the
/// client's stream connection.
pub async fn upload_file(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
    mut multipart: Multipart,
) -> AppResult<Json<UploadAccepted>> {
    let client_id = ClientId::parse(client_id)?;
    let part = read_file_part(&mut multipart).await?;

    let permit = state.job_runner.reserve(&client_id)?;

    let job_id = uuid::Uuid::now_v7();
    let file = state
        .file_store
        .store(job_id, &part.file_name, &part.data)
        .await?;

    tracing::info!(
        client_id = %client_id,
        job_id = %job_id,
        file = %file.file_name,
        size = file.size,
        store = state.file_store.name(),
        "Upload accepted",
    );

    // Detached: the job outlives this request.
    state.job_runner.spawn(
        Job {
            id: job_id,
            client_id,
            file,
        },
        permit,
    );

    Ok(Json(UploadAccepted {
        message: MSG_ACCEPTED,
        job_id,
    }))
}

/// Pull the `file` field out of the multipart body, skipping any others.
async fn read_file_part(multipart: &mut Multipart) -> AppResult<FilePart> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or(FALLBACK_FILE_NAME).to_string();
        let data = field.bytes().await?;

        if data.is_empty() {
            return Err(CoreError::Validation("Uploaded file is empty".into()).into());
        }

        return Ok(FilePart { file_name, data });
    }

    Err(CoreError::Validation(format!("Missing multipart field '{FILE_FIELD}'")).into())
}
