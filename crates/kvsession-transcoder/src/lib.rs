//! Session payload transcoders.
//!
//! A [`Transcoder`] turns a serializable value into bytes and back. All
//! implementations here are stateless, so one instance can be shared by any
//! number of concurrent callers.

mod error;
mod json;
mod tagged;

use serde::Serialize;
use serde::de::DeserializeOwned;

pub use error::{Result, TranscoderError};
pub use json::JsonTranscoder;
pub use tagged::TaggedTranscoder;

/// Encode values to bytes and decode them back.
pub trait Transcoder: Send + Sync {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>>;

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;
}
