use std::time::Duration;

use async_trait::async_trait;
use docflow_core::progress::ProgressStage;

use super::simulate_work;
use crate::error::StageError;
use crate::stage::{Stage, StageContext, StepReporter};

/// Processes the document page by page, reporting one step per page.
pub struct PageProcessingStage {
    delay_per_page: Duration,
    default_pages: u32,
}

impl PageProcessingStage {
    /// `default_pages` applies when no earlier stage determined a page count.
    pub fn new(delay_per_page: Duration, default_pages: u32) -> Self {
        Self {
            delay_per_page,
            default_pages: default_pages.max(1),
        }
    }
}

#[async_trait]
impl Stage for PageProcessingStage {
    fn kind(&self) -> ProgressStage {
        ProgressStage::Processing
    }

    fn entry_message(&self) -> Option<String> {
        None
    }

    async fn execute(
        &self,
        ctx: &mut StageContext,
        reporter: &StepReporter,
    ) -> Result<(), StageError> {
        let total = ctx.page_count.unwrap_or(self.default_pages);

        for page in 1..=total {
            reporter
                .step(page, total, format!("Processing page {page} of {total}"))
                .await;
            simulate_work(self.delay_per_page).await;
        }

        ctx.summary
            .insert("pages_processed".into(), serde_json::Value::from(total));
        Ok(())
    }
}
