use std::time::Duration;

use async_trait::async_trait;
use docflow_core::progress::ProgressStage;

use super::simulate_work;
use crate::error::StageError;
use crate::stage::{Stage, StageContext, StepReporter};

/// Checks the stored upload and determines its page count.
pub struct ParseStage {
    delay: Duration,
    pages: u32,
}

impl ParseStage {
    pub fn new(delay: Duration, pages: u32) -> Self {
        Self {
            delay,
            pages: pages.max(1),
        }
    }
}

#[async_trait]
impl Stage for ParseStage {
    fn kind(&self) -> ProgressStage {
        ProgressStage::Parsing
    }

    fn entry_message(&self) -> Option<String> {
        Some("Parsing document...".to_string())
    }

    async fn execute(
        &self,
        ctx: &mut StageContext,
        _reporter: &StepReporter,
    ) -> Result<(), StageError> {
        let metadata = tokio::fs::metadata(&ctx.file.path).await.map_err(|e| {
            StageError::Input(format!(
                "stored file {} is unavailable: {e}",
                ctx.file.path.display()
            ))
        })?;

        if metadata.len() == 0 {
            return Err(StageError::Input(format!(
                "stored file {} is empty",
                ctx.file.file_name
            )));
        }

        simulate_work(self.delay).await;

        ctx.page_count = Some(self.pages);
        tracing::debug!(job_id = %ctx.job_id, pages = self.pages, "Document parsed");
        Ok(())
    }
}
