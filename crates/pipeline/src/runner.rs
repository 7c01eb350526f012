//! Job runner: executes the stage list for one upload on its own task.
//!
//! Every job publishes `uploaded`, then whatever its stages emit, then
//! exactly one terminal event (`completed` or `failed`). Stage errors,
//! panics and an exceeded lifetime all end in `failed`; nothing is
//! propagated to whoever spawned the job.

use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use docflow_core::error::CoreError;
use docflow_core::progress::ProgressEvent;
use docflow_core::storage::StoredFile;
use docflow_core::types::{ClientId, JobId};
use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::config::SimulationConfig;
use crate::sink::ProgressSink;
use crate::stage::{Stage, StageContext, StepReporter};
use crate::stages::simulated_pipeline;

/// Default upper bound on a single job's lifetime.
pub const DEFAULT_MAX_JOB_DURATION: Duration = Duration::from_secs(600);

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// One processing run for one uploaded file.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub client_id: ClientId,
    pub file: StoredFile,
}

/// How a job ended. Mirrors the terminal event that was published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Failed(String),
}

// ---------------------------------------------------------------------------
// In-flight guard
// ---------------------------------------------------------------------------

/// Set of client ids that currently have a job running.
#[derive(Debug, Clone, Default)]
pub struct InFlightJobs {
    inner: Arc<Mutex<HashSet<ClientId>>>,
}

impl InFlightJobs {
    /// Claim the slot for `client_id`.
    ///
    /// Fails with [`CoreError::Conflict`] while another job for the same
    /// client is still running. The slot is released when the returned
    /// permit is dropped.
    pub fn reserve(&self, client_id: &ClientId) -> Result<JobPermit, CoreError> {
        let mut set = self.lock();
        if !set.insert(client_id.clone()) {
            return Err(CoreError::Conflict(format!(
                "A job for client '{client_id}' is already in progress"
            )));
        }
        Ok(JobPermit {
            jobs: self.clone(),
            client_id: client_id.clone(),
        })
    }

    pub fn contains(&self, client_id: &ClientId) -> bool {
        self.lock().contains(client_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<ClientId>> {
        // The set stays consistent even if a holder panicked mid-operation.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Proof of an in-flight reservation; releases it on drop.
#[derive(Debug)]
pub struct JobPermit {
    jobs: InFlightJobs,
    client_id: ClientId,
}

impl JobPermit {
    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }
}

impl Drop for JobPermit {
    fn drop(&mut self) {
        self.jobs.lock().remove(&self.client_id);
    }
}

// ---------------------------------------------------------------------------
// JobRunner
// ---------------------------------------------------------------------------

/// Runs jobs through a fixed list of [`Stage`]s.
///
/// Shared via `Arc<JobRunner>`; holds no per-job state.
pub struct JobRunner {
    stages: Vec<Arc<dyn Stage>>,
    sink: Arc<dyn ProgressSink>,
    max_duration: Duration,
    in_flight: InFlightJobs,
}

impl JobRunner {
    pub fn new(sink: Arc<dyn ProgressSink>, stages: Vec<Arc<dyn Stage>>) -> Self {
        Self {
            stages,
            sink,
            max_duration: DEFAULT_MAX_JOB_DURATION,
            in_flight: InFlightJobs::default(),
        }
    }

    /// Runner wired with the simulated parse / pages / finalize stages.
    pub fn simulated(sink: Arc<dyn ProgressSink>, config: &SimulationConfig) -> Self {
        Self::new(sink, simulated_pipeline(config))
    }

    /// Override the maximum lifetime of a job.
    pub fn with_max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = max_duration;
        self
    }

    pub fn in_flight(&self) -> &InFlightJobs {
        &self.in_flight
    }

    /// Reserve the in-flight slot for `client_id`; see [`InFlightJobs::reserve`].
    pub fn reserve(&self, client_id: &ClientId) -> Result<JobPermit, CoreError> {
        self.in_flight.reserve(client_id)
    }

    /// Run `job` on an independent task.
    ///
    /// Returns immediately. The permit is released just before the terminal
    /// event is published, so a client reacting to that event can upload
    /// again without hitting the in-flight guard.
    pub fn spawn(self: &Arc<Self>, job: Job, permit: JobPermit) -> JoinHandle<JobOutcome> {
        let runner = Arc::clone(self);
        tokio::spawn(async move { runner.execute(&job, Some(permit)).await })
    }

    /// Run `job` to its terminal event on the current task.
    pub async fn run(&self, job: &Job) -> JobOutcome {
        self.execute(job, None).await
    }

    async fn execute(&self, job: &Job, permit: Option<JobPermit>) -> JobOutcome {
        let span = tracing::info_span!("job", job_id = %job.id, client_id = %job.client_id);

        async move {
            tracing::info!(file = %job.file.file_name, size = job.file.size, "Job started");
            self.sink
                .publish(&job.client_id, ProgressEvent::uploaded())
                .await;

            let stages = AssertUnwindSafe(self.run_stages(job)).catch_unwind();
            let result = match tokio::time::timeout(self.max_duration, stages).await {
                Ok(Ok(result)) => result,
                Ok(Err(payload)) => Err(format!("Processing aborted: {}", panic_message(&*payload))),
                Err(_) => Err(format!(
                    "Processing exceeded the {}s time limit",
                    self.max_duration.as_secs()
                )),
            };

            drop(permit);

            match result {
                Ok(()) => {
                    self.sink
                        .publish(&job.client_id, ProgressEvent::completed())
                        .await;
                    tracing::info!("Job completed");
                    JobOutcome::Completed
                }
                Err(reason) => {
                    self.sink
                        .publish(&job.client_id, ProgressEvent::failed(reason.clone()))
                        .await;
                    tracing::warn!(reason = %reason, "Job failed");
                    JobOutcome::Failed(reason)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run_stages(&self, job: &Job) -> Result<(), String> {
        let mut ctx = StageContext::new(job.id, job.file.clone());

        for stage in &self.stages {
            let kind = stage.kind();
            if let Some(message) = stage.entry_message() {
                self.sink
                    .publish(&job.client_id, ProgressEvent::new(kind, message))
                    .await;
            }

            let reporter = StepReporter::new(Arc::clone(&self.sink), job.client_id.clone(), kind);
            stage
                .execute(&mut ctx, &reporter)
                .await
                .map_err(|e| format!("{} stage failed: {e}", kind.as_str()))?;

            tracing::debug!(stage = kind.as_str(), "Stage finished");
        }

        Ok(())
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "stage panicked".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::OnceLock;

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use docflow_core::progress::ProgressStage;
    use tokio::sync::Notify;

    use super::*;
    use crate::error::StageError;
    use crate::stages::RESULT_SUFFIX;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<(ClientId, ProgressEvent)>>,
    }

    impl RecordingSink {
        fn stages(&self) -> Vec<ProgressStage> {
            self.events.lock().unwrap().iter().map(|(_, e)| e.stage).collect()
        }

        fn events(&self) -> Vec<ProgressEvent> {
            self.events.lock().unwrap().iter().map(|(_, e)| e.clone()).collect()
        }
    }

    #[async_trait]
    impl ProgressSink for RecordingSink {
        async fn publish(&self, client_id: &ClientId, event: ProgressEvent) {
            self.events.lock().unwrap().push((client_id.clone(), event));
        }
    }

    /// Records whether the client's in-flight slot was still held when the
    /// terminal event went out.
    #[derive(Default)]
    struct SlotCheckingSink {
        jobs: OnceLock<InFlightJobs>,
        held_at_terminal: Mutex<Option<bool>>,
    }

    #[async_trait]
    impl ProgressSink for SlotCheckingSink {
        async fn publish(&self, client_id: &ClientId, event: ProgressEvent) {
            if event.is_terminal() {
                let held = self.jobs.get().map(|jobs| jobs.contains(client_id));
                *self.held_at_terminal.lock().unwrap() = held;
            }
        }
    }

    struct PanickingStage;

    #[async_trait]
    impl Stage for PanickingStage {
        fn kind(&self) -> ProgressStage {
            ProgressStage::Processing
        }
        fn entry_message(&self) -> Option<String> {
            None
        }
        async fn execute(&self, _: &mut StageContext, _: &StepReporter) -> Result<(), StageError> {
            panic!("boom");
        }
    }

    struct StallingStage;

    #[async_trait]
    impl Stage for StallingStage {
        fn kind(&self) -> ProgressStage {
            ProgressStage::Parsing
        }
        fn entry_message(&self) -> Option<String> {
            Some("Parsing document...".into())
        }
        async fn execute(&self, _: &mut StageContext, _: &StepReporter) -> Result<(), StageError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }

    struct GatedStage {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl Stage for GatedStage {
        fn kind(&self) -> ProgressStage {
            ProgressStage::Processing
        }
        fn entry_message(&self) -> Option<String> {
            None
        }
        async fn execute(&self, _: &mut StageContext, _: &StepReporter) -> Result<(), StageError> {
            self.gate.notified().await;
            Ok(())
        }
    }

    fn client(id: &str) -> ClientId {
        ClientId::parse(id).unwrap()
    }

    async fn stored_job(dir: &std::path::Path, client_id: &str) -> Job {
        let path = dir.join("a.bin");
        tokio::fs::write(&path, b"0123456789").await.unwrap();
        Job {
            id: uuid::Uuid::now_v7(),
            client_id: client(client_id),
            file: StoredFile {
                path,
                file_name: "a.bin".into(),
                size: 10,
            },
        }
    }

    #[tokio::test]
    async fn emits_full_sequence_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let runner = JobRunner::simulated(sink.clone(), &SimulationConfig::instant(4));
        let job = stored_job(tmp.path(), "c1").await;

        let outcome = runner.run(&job).await;

        assert_eq!(outcome, JobOutcome::Completed);
        let events = sink.events();
        let observed: Vec<(ProgressStage, Option<u8>)> =
            events.iter().map(|e| (e.stage, e.progress)).collect();
        assert_eq!(
            observed,
            vec![
                (ProgressStage::Uploaded, None),
                (ProgressStage::Parsing, None),
                (ProgressStage::Processing, Some(25)),
                (ProgressStage::Processing, Some(50)),
                (ProgressStage::Processing, Some(75)),
                (ProgressStage::Processing, Some(100)),
                (ProgressStage::Finalizing, None),
                (ProgressStage::Completed, Some(100)),
            ]
        );
        assert_eq!(events[2].message, "Processing page 1 of 4");
        assert!(sink
            .events
            .lock()
            .unwrap()
            .iter()
            .all(|(id, _)| id.as_str() == "c1"));

        let result_path = tmp.path().join(format!("a.bin{RESULT_SUFFIX}"));
        let result: serde_json::Value =
            serde_json::from_slice(&tokio::fs::read(result_path).await.unwrap()).unwrap();
        assert_eq!(result["pages_processed"], 4);
        assert_eq!(result["size"], 10);
    }

    #[tokio::test]
    async fn missing_file_emits_single_failed_event() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let runner = JobRunner::simulated(sink.clone(), &SimulationConfig::instant(3));
        let job = Job {
            id: uuid::Uuid::now_v7(),
            client_id: client("c1"),
            file: StoredFile {
                path: tmp.path().join("gone.bin"),
                file_name: "gone.bin".into(),
                size: 4,
            },
        };

        let outcome = runner.run(&job).await;

        assert_matches!(outcome, JobOutcome::Failed(ref reason) if reason.contains("parsing stage failed"));
        assert_eq!(
            sink.stages(),
            vec![ProgressStage::Uploaded, ProgressStage::Parsing, ProgressStage::Failed]
        );
    }

    #[tokio::test]
    async fn panicking_stage_is_reported_as_failed() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let runner = JobRunner::new(sink.clone(), vec![Arc::new(PanickingStage)]);
        let job = stored_job(tmp.path(), "c1").await;

        let outcome = runner.run(&job).await;

        assert_matches!(outcome, JobOutcome::Failed(ref reason) if reason.contains("boom"));
        let events = sink.events();
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
        assert_eq!(events.last().map(|e| e.stage), Some(ProgressStage::Failed));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_job_times_out_as_failed() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let runner = JobRunner::new(sink.clone(), vec![Arc::new(StallingStage)])
            .with_max_duration(Duration::from_secs(5));
        let job = stored_job(tmp.path(), "c1").await;

        let outcome = runner.run(&job).await;

        assert_matches!(outcome, JobOutcome::Failed(ref reason) if reason.contains("5s time limit"));
        assert_eq!(
            sink.stages(),
            vec![ProgressStage::Uploaded, ProgressStage::Parsing, ProgressStage::Failed]
        );
    }

    #[tokio::test]
    async fn spawn_returns_before_job_finishes() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = Arc::new(RecordingSink::default());
        let gate = Arc::new(Notify::new());
        let runner = Arc::new(JobRunner::new(
            sink.clone(),
            vec![Arc::new(GatedStage { gate: gate.clone() })],
        ));
        let job = stored_job(tmp.path(), "c1").await;
        let permit = runner.reserve(&job.client_id).unwrap();

        let handle = runner.spawn(job.clone(), permit);

        assert!(!handle.is_finished());
        assert!(runner.in_flight().contains(&job.client_id));

        gate.notify_one();
        assert_eq!(handle.await.unwrap(), JobOutcome::Completed);
        assert!(runner.in_flight().is_empty());
        assert_eq!(sink.stages().last(), Some(&ProgressStage::Completed));
    }

    #[tokio::test]
    async fn slot_is_free_by_the_time_the_terminal_event_is_published() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = Arc::new(SlotCheckingSink::default());
        let runner = Arc::new(JobRunner::simulated(sink.clone(), &SimulationConfig::instant(2)));
        sink.jobs.set(runner.in_flight().clone()).unwrap();
        let job = stored_job(tmp.path(), "c1").await;
        let permit = runner.reserve(&job.client_id).unwrap();

        let outcome = runner.spawn(job, permit).await.unwrap();

        assert_eq!(outcome, JobOutcome::Completed);
        assert_eq!(*sink.held_at_terminal.lock().unwrap(), Some(false));
    }

    #[test]
    fn reserve_rejects_duplicate_until_released() {
        let jobs = InFlightJobs::default();
        let c1 = client("c1");

        let permit = jobs.reserve(&c1).unwrap();
        assert_eq!(permit.client_id(), &c1);
        assert_matches!(jobs.reserve(&c1), Err(CoreError::Conflict(_)));

        // A different client is unaffected.
        let other = jobs.reserve(&client("c2")).unwrap();
        assert_eq!(jobs.len(), 2);

        drop(permit);
        assert!(!jobs.contains(&c1));
        assert!(jobs.reserve(&c1).is_ok());
        drop(other);
    }
}
