//! Background processing pipeline for uploaded files.
//!
//! - [`Stage`]: one pluggable unit of work that may report sub-progress.
//! - [`JobRunner`]: runs the stage list for a job on its own Tokio task and
//!   publishes ordered [`ProgressEvent`](docflow_core::progress::ProgressEvent)s
//!   through a [`ProgressSink`].
//! - [`stages`]: the simulated parse / page-processing / finalize stages.

pub mod config;
pub mod error;
pub mod runner;
pub mod sink;
pub mod stage;
pub mod stages;

pub use config::SimulationConfig;
pub use error::StageError;
pub use runner::{InFlightJobs, Job, JobOutcome, JobPermit, JobRunner};
pub use sink::ProgressSink;
pub use stage::{Stage, StageContext, StepReporter};
