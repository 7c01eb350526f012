/// Failure inside a processing stage.
///
/// Never retried; the runner turns it into a single `failed` event.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("Invalid input: {0}")]
    Input(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Worker error: {0}")]
    Worker(String),
}
