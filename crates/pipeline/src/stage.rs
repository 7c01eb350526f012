use std::sync::Arc;

use async_trait::async_trait;
use docflow_core::progress::{step_percent, ProgressEvent, ProgressStage};
use docflow_core::storage::StoredFile;
use docflow_core::types::{ClientId, JobId};

use crate::error::StageError;
use crate::sink::ProgressSink;

/// Mutable state threaded through the stages of one job.
#[derive(Debug)]
pub struct StageContext {
    pub job_id: JobId,
    pub file: StoredFile,
    /// Set by the parsing stage; consumed by per-page processing.
    pub page_count: Option<u32>,
    /// Accumulated result fields, written out by the finalize stage.
    pub summary: serde_json::Map<String, serde_json::Value>,
}

impl StageContext {
    pub fn new(job_id: JobId, file: StoredFile) -> Self {
        Self {
            job_id,
            file,
            page_count: None,
            summary: serde_json::Map::new(),
        }
    }
}

/// Publishes sub-step progress for the stage currently executing.
pub struct StepReporter {
    sink: Arc<dyn ProgressSink>,
    client_id: ClientId,
    stage: ProgressStage,
}

impl StepReporter {
    pub fn new(sink: Arc<dyn ProgressSink>, client_id: ClientId, stage: ProgressStage) -> Self {
        Self {
            sink,
            client_id,
            stage,
        }
    }

    /// Report completion of `step` out of `total`.
    pub async fn step(&self, step: u32, total: u32, message: impl Into<String> + Send) {
        let event = ProgressEvent::new(self.stage, message).with_progress(step_percent(step, total));
        self.sink.publish(&self.client_id, event).await;
    }
}

/// One unit of work in the processing pipeline.
///
/// Stages without countable sub-steps announce themselves with an entry
/// message. Stages that report steps return `None` from
/// [`entry_message`](Stage::entry_message) and emit their own events through
/// the [`StepReporter`].
#[async_trait]
pub trait Stage: Send + Sync {
    fn kind(&self) -> ProgressStage;

    fn entry_message(&self) -> Option<String>;

    async fn execute(
        &self,
        ctx: &mut StageContext,
        reporter: &StepReporter,
    ) -> Result<(), StageError>;
}
