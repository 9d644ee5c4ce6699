//! Body encoding for outbound payloads and decoding of upstream bodies.

use axum::body::Bytes;
use serde_json::Value;

/// A payload ready to be written to the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundBody {
    pub bytes: Bytes,
    /// Serialized from a structured JSON value.
    pub is_json: bool,
}

impl OutboundBody {
    /// Strings go out as raw text, any other value as serialized JSON.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(text) => Self {
                bytes: Bytes::from(text.clone()),
                is_json: false,
            },
            other => Self {
                bytes: Bytes::from(other.to_string()),
                is_json: true,
            },
        }
    }
}

/// Interpret an upstream body: JSON when it parses, text otherwise.
pub fn decode_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::String(String::new());
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}
