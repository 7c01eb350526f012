use async_trait::async_trait;
use docflow_core::progress::ProgressEvent;
use docflow_core::types::ClientId;

/// Destination for progress events emitted by a running job.
///
/// Publishing is best-effort and infallible from the job's point of view:
/// an implementation must swallow delivery failures.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn publish(&self, client_id: &ClientId, event: ProgressEvent);
}
