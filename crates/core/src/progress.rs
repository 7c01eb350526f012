//! Progress event model pushed to clients over the stream connection.
//!
//! Every frame the server writes is a JSON object of the shape
//! `{"stage": string, "message": string, "progress": integer | null}`.

use serde::{Deserialize, Serialize};

/// Message sent when a job is first accepted.
pub const MSG_UPLOADED: &str = "File successfully uploaded";

/// Message sent on successful completion.
pub const MSG_COMPLETED: &str = "Processing completed!";

/// Lifecycle stage a progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStage {
    Uploaded,
    Parsing,
    Processing,
    Finalizing,
    Completed,
    Failed,
}

impl ProgressStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::Parsing => "parsing",
            Self::Processing => "processing",
            Self::Finalizing => "finalizing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// `completed` and `failed` end a session; nothing follows them.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// One unit of status/progress pushed to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub stage: ProgressStage,
    pub message: String,
    /// Percentage in `0..=100`, or `None` for stages without a measure.
    pub progress: Option<u8>,
}

impl ProgressEvent {
    pub fn new(stage: ProgressStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            progress: None,
        }
    }

    /// Attach a percentage, clamped to 100.
    pub fn with_progress(mut self, percent: u8) -> Self {
        self.progress = Some(percent.min(100));
        self
    }

    pub fn uploaded() -> Self {
        Self::new(ProgressStage::Uploaded, MSG_UPLOADED)
    }

    pub fn completed() -> Self {
        Self::new(ProgressStage::Completed, MSG_COMPLETED).with_progress(100)
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::new(ProgressStage::Failed, reason)
    }

    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }
}

/// `round(100 * step / total)`, saturating at 100.
///
/// A `total` of zero reports 100: there is nothing left to do. Any completed
/// step reports at least 1, so with more than 200 steps the first one still
/// shows movement instead of rounding down to 0.
pub fn step_percent(step: u32, total: u32) -> u8 {
    if total == 0 {
        return 100;
    }
    if step == 0 {
        return 0;
    }
    let step = u64::from(step.min(total));
    let total = u64::from(total);
    // Integer round-half-up of 100 * step / total.
    let percent = ((200 * step + total) / (2 * total)) as u8;
    percent.max(1)
}
