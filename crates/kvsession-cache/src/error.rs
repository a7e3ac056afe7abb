//! Error types for session cache operations.

use kvsession_client::ClientError;
use kvsession_transcoder::TranscoderError;

/// Error type for session cache operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Backend call failed.
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    /// Session payload could not be encoded or decoded.
    #[error("Transcoder error: {0}")]
    Transcoder(#[from] TranscoderError),

    /// A session with this id already exists on the backend.
    #[error("Session already exists: {0}")]
    AlreadyExists(String),

    /// Session was not found in cache or storage.
    #[error("Session not found: {0}")]
    NotFound(String),

    /// The cache has been shut down.
    #[error("Session cache is closed")]
    Closed,
}

/// Result type for session cache operations.
pub type Result<T> = std::result::Result<T, Error>;
