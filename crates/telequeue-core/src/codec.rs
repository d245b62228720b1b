//! Record encoding
//!
//! The storage engine only sees bytes. A [`RecordCodec`] turns records into
//! payloads on the way in and back on the way out.

use thiserror::Error;

use crate::models::Record;

/// Errors raised while encoding or decoding a record
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Failed to encode record: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Failed to decode record: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Stored payload is valid JSON but not an object")]
    NotAnObject,
}

/// Converts records to and from stored payloads
pub trait RecordCodec {
    fn encode(&self, record: &Record) -> Result<Vec<u8>, CodecError>;

    fn decode(&self, payload: &[u8]) -> Result<Record, CodecError>;
}

/// JSON object encoding
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl RecordCodec for JsonCodec {
    fn encode(&self, record: &Record) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(record).map_err(CodecError::Encode)
    }

    fn decode(&self, payload: &[u8]) -> Result<Record, CodecError> {
        match serde_json::from_slice(payload).map_err(CodecError::Decode)? {
            serde_json::Value::Object(record) => Ok(record),
            _ => Err(CodecError::NotAnObject),
        }
    }
}
