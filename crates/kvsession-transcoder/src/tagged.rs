//! Type-tagged framing over another transcoder.
//!
//! Layout: `<type name> 0x00 <inner payload>`. Decoding checks the tag
//! against the requested type before touching the body.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::trace;

use crate::Transcoder;
use crate::error::{Result, TranscoderError};
use crate::json::JsonTranscoder;

const SEPARATOR: u8 = 0;

/// Prefixes every payload with the encoded type's name.
#[derive(Debug, Clone, Default)]
pub struct TaggedTranscoder<I = JsonTranscoder> {
    inner: I,
}

impl<I: Transcoder> TaggedTranscoder<I> {
    pub fn new(inner: I) -> Self {
        Self { inner }
    }
}

impl<I: Transcoder> Transcoder for TaggedTranscoder<I> {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        let tag = std::any::type_name::<T>();
        let body = self.inner.encode(value)?;
        let mut out = Vec::with_capacity(tag.len() + 1 + body.len());
        out.extend_from_slice(tag.as_bytes());
        out.push(SEPARATOR);
        out.extend_from_slice(&body);
        Ok(out)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        let split = bytes
            .iter()
            .position(|b| *b == SEPARATOR)
            .ok_or_else(|| TranscoderError::Malformed("missing type tag".to_string()))?;
        let found = std::str::from_utf8(&bytes[..split])
            .map_err(|e| TranscoderError::Malformed(format!("type tag is not UTF-8: {e}")))?;
        let expected = std::any::type_name::<T>();
        if found != expected {
            return Err(TranscoderError::TypeMismatch {
                expected: expected.to_string(),
                found: found.to_string(),
            });
        }
        trace!(tag = %found, len = bytes.len() - split - 1, "Decoding tagged payload");
        self.inner.decode(&bytes[split + 1..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Cart {
        items: Vec<String>,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Profile {
        items: Vec<String>,
    }

    #[test]
    fn test_decode_checks_tag() {
        let t = TaggedTranscoder::new(JsonTranscoder);
        let cart = Cart {
            items: vec!["book".to_string()],
        };
        let bytes = t.encode(&cart).unwrap();

        assert_eq!(t.decode::<Cart>(&bytes).unwrap(), cart);

        // Same shape, different type.
        let err = t.decode::<Profile>(&bytes).unwrap_err();
        assert!(matches!(err, TranscoderError::TypeMismatch { .. }));
    }

    #[test]
    fn test_untagged_bytes_are_malformed() {
        let t = TaggedTranscoder::<JsonTranscoder>::default();
        let err = t.decode::<Cart>(br#"{"items":[]}"#).unwrap_err();
        assert!(matches!(err, TranscoderError::Malformed(_)));
    }
}
