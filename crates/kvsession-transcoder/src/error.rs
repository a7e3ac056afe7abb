//! Transcoder error types.

/// Error returned when a value cannot be turned into bytes or back.
///
/// Decoding never yields a partially populated value: any failure is
/// reported here instead.
#[derive(Debug, thiserror::Error)]
pub enum TranscoderError {
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// The payload was written for a different type than requested.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// The payload framing is invalid.
    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// Result type for transcoder operations.
pub type Result<T> = std::result::Result<T, TranscoderError>;
