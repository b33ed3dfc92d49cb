//! Inbound chat completion request envelope.

use bytes::Bytes;
use serde_json::Value;

use crate::error::Error;

/// Chat completion request (OpenAI-compatible), kept as opaque JSON.
///
/// Only the `stream` flag is interpreted. The original body bytes are kept
/// and forwarded to the upstream exactly as received.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatCompletionRequest {
    json: Value,
    body: Bytes,
}

impl ChatCompletionRequest {
    /// Parse a raw request body. The body must be a JSON object.
    pub fn from_slice(body: &[u8]) -> Result<Self, Error> {
        let json: Value = serde_json::from_slice(body)
            .map_err(|e| Error::BadRequest(format!("body is not valid JSON: {}", e)))?;
        Self::new(json, Bytes::copy_from_slice(body))
    }

    fn new(json: Value, body: Bytes) -> Result<Self, Error> {
        if json.is_object() {
            Ok(Self { json, body })
        } else {
            Err(Error::BadRequest("body must be a JSON object".to_string()))
        }
    }

    /// True only when `stream` is present and is the boolean `true`.
    pub fn is_streaming(&self) -> bool {
        self.json.get("stream").and_then(Value::as_bool).unwrap_or(false)
    }

    /// Requested model, if the caller supplied one as a string.
    pub fn model(&self) -> Option<&str> {
        self.json.get("model").and_then(Value::as_str)
    }

    /// Body bytes sent to the upstream.
    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

impl TryFrom<Value> for ChatCompletionRequest {
    type Error = Error;

    fn try_from(json: Value) -> Result<Self, Self::Error> {
        let body = serde_json::to_vec(&json)
            .map_err(|e| Error::Internal(format!("failed to encode request: {}", e)))?;
        Self::new(json, Bytes::from(body))
    }
}
