//! JSON transcoder.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::Transcoder;
use crate::error::{Result, TranscoderError};

/// Stateless JSON encoding via `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTranscoder;

impl JsonTranscoder {
    pub fn new() -> Self {
        Self
    }
}

impl Transcoder for JsonTranscoder {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(TranscoderError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(TranscoderError::Decode)
    }
}
