use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use docflow_core::progress::ProgressStage;

use super::simulate_work;
use crate::error::StageError;
use crate::stage::{Stage, StageContext, StepReporter};

/// Suffix appended to the stored file name for the generated result.
pub const RESULT_SUFFIX: &str = ".result.json";

/// Writes the accumulated job summary as JSON next to the stored upload.
pub struct FinalizeStage {
    delay: Duration,
}

impl FinalizeStage {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Location of the result document for a stored upload.
    pub fn result_path(ctx: &StageContext) -> PathBuf {
        ctx.file
            .path
            .with_file_name(format!("{}{RESULT_SUFFIX}", ctx.file.file_name))
    }
}

#[async_trait]
impl Stage for FinalizeStage {
    fn kind(&self) -> ProgressStage {
        ProgressStage::Finalizing
    }

    fn entry_message(&self) -> Option<String> {
        Some("Generating final JSON...".to_string())
    }

    async fn execute(
        &self,
        ctx: &mut StageContext,
        _reporter: &StepReporter,
    ) -> Result<(), StageError> {
        simulate_work(self.delay).await;

        let mut result = ctx.summary.clone();
        result.insert("job_id".into(), ctx.job_id.to_string().into());
        result.insert("file_name".into(), ctx.file.file_name.clone().into());
        result.insert("size".into(), ctx.file.size.into());

        let body = serde_json::to_vec_pretty(&result)
            .map_err(|e| StageError::Worker(format!("failed to encode result: {e}")))?;
        let path = Self::result_path(ctx);
        tokio::fs::write(&path, body).await?;

        tracing::debug!(job_id = %ctx.job_id, path = %path.display(), "Result written");
        Ok(())
    }
}
