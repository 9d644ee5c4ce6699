//! Outcome normalization.
//!
//! Pure transform from "what the upstream did" (a response or a classified
//! failure, plus elapsed time) to a [`ResultDescriptor`]. No I/O happens
//! here and no environment is read.

use std::collections::BTreeMap;
use std::time::Duration;

use axum::body::Bytes;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde_json::{json, Value};

use crate::config::RelaySettings;
use crate::relay::body::decode_body;
use crate::relay::descriptor::{RelayStatus, ResponseData, ResultData, ResultDescriptor};
use crate::relay::error::{RelayError, NETWORK_ERROR_MESSAGE, TIMEOUT_MESSAGE};

/// A fully-read upstream response.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Shapes engine outcomes into result descriptors.
#[derive(Debug, Clone)]
pub struct Normalizer {
    truncate_limit: usize,
    marker: String,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::from_settings(&RelaySettings::default())
    }
}

impl Normalizer {
    pub fn new(truncate_limit: usize, marker: impl Into<String>) -> Self {
        Self {
            truncate_limit,
            marker: marker.into(),
        }
    }

    pub fn from_settings(settings: &RelaySettings) -> Self {
        Self::new(settings.truncate_limit, settings.truncation_marker.clone())
    }

    /// Any HTTP response, whatever its status code, is a success here.
    pub fn success(&self, response: UpstreamResponse, elapsed: Duration) -> ResultDescriptor {
        let body = self.truncate(decode_body(&response.body));
        ResultDescriptor {
            status: RelayStatus::Success,
            http_status: Some(response.status.as_u16()),
            time_cost_ms: millis(elapsed),
            message: "ok".to_string(),
            data: Some(ResultData::Response(ResponseData {
                status_text: response
                    .status
                    .canonical_reason()
                    .unwrap_or_default()
                    .to_string(),
                headers: flatten_headers(&response.headers),
                body,
            })),
        }
    }

    /// Classify a dispatch failure.
    pub fn failure(&self, error: &RelayError, elapsed: Duration) -> ResultDescriptor {
        let (status, message) = match error {
            RelayError::Timeout => (RelayStatus::Timeout, TIMEOUT_MESSAGE.to_string()),
            RelayError::Network { .. } => (RelayStatus::Error, NETWORK_ERROR_MESSAGE.to_string()),
            other => {
                let message = other.to_string();
                let message = if message.is_empty() { "error".to_string() } else { message };
                (RelayStatus::Error, message)
            }
        };

        ResultDescriptor {
            status,
            http_status: error.upstream_status(),
            time_cost_ms: millis(elapsed),
            message,
            data: partial_payload(error),
        }
    }

    /// Cut textual bodies to the configured number of characters.
    /// Structured bodies pass through untouched.
    pub fn truncate(&self, body: Value) -> Value {
        match body {
            Value::String(text) if text.chars().count() > self.truncate_limit => {
                let mut cut: String = text.chars().take(self.truncate_limit).collect();
                cut.push_str(&self.marker);
                Value::String(cut)
            }
            other => other,
        }
    }
}

/// What survives of a response that failed after its headers arrived.
fn partial_payload(error: &RelayError) -> Option<ResultData> {
    let status = StatusCode::from_u16(error.upstream_status()?).ok()?;
    Some(ResultData::Raw(json!({
        "statusText": status.canonical_reason().unwrap_or_default(),
        "error": error.to_string(),
    })))
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// Lower-case names; repeated headers are joined with `, `.
pub fn flatten_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut flat: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        flat.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    flat
}
