/// Errors raised by [`DocflowClient`](crate::DocflowClient) and
/// [`ProgressStream`](crate::ProgressStream).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server URL or client id could not be turned into an endpoint.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Failed to establish the stream connection.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The upload request failed or was rejected by the server.
    #[error("Upload failed: {0}")]
    Upload(String),

    /// A frame on an established stream could not be read, written or decoded.
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
