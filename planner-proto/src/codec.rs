//! JSON encoding and schema-checked decoding for the planner wire format.
//!
//! Decoding is the schema validation step: a response body that does not
//! match the expected type is a [`CodecError::Schema`] and is never retried.

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Error type for codec encode/decode operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// A request body could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// A response body did not match the expected schema.
    #[error("schema validation failed: {0}")]
    Schema(String),
}

/// Encodes a request body as JSON.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the value cannot be serialized.
pub fn encode<T: Serialize>(value: &T) -> Result<String, CodecError> {
    serde_json::to_string(value).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Decodes and validates a JSON response body.
///
/// # Errors
///
/// Returns `CodecError::Schema` if the text is not valid JSON of shape `T`.
pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T, CodecError> {
    serde_json::from_str(text).map_err(|e| CodecError::Schema(e.to_string()))
}
