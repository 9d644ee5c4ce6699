//! Request and result descriptors.
//!
//! [`CheckRequest`] is the loose JSON shape accepted at the boundary.
//! [`RequestDescriptor`] is the validated, fully-defaulted form the engine
//! consumes, and [`ResultDescriptor`] is what comes back out.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::config::RelaySettings;
use crate::relay::error::{RelayError, RelayResult};

/// HTTP methods the check relay accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RelayMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
}

impl RelayMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
        }
    }

    /// GET and HEAD never carry a body.
    pub fn allows_body(self) -> bool {
        !matches!(self, Self::Get | Self::Head)
    }
}

impl FromStr for RelayMethod {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "PATCH" => Ok(Self::Patch),
            "HEAD" => Ok(Self::Head),
            other => Err(RelayError::validation(format!("Invalid method: {other}"))),
        }
    }
}

impl TryFrom<String> for RelayMethod {
    type Error = RelayError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RelayMethod> for String {
    fn from(method: RelayMethod) -> Self {
        method.as_str().to_string()
    }
}

impl From<RelayMethod> for Method {
    fn from(method: RelayMethod) -> Self {
        match method {
            RelayMethod::Get => Method::GET,
            RelayMethod::Post => Method::POST,
            RelayMethod::Put => Method::PUT,
            RelayMethod::Delete => Method::DELETE,
            RelayMethod::Patch => Method::PATCH,
            RelayMethod::Head => Method::HEAD,
        }
    }
}

impl fmt::Display for RelayMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST /relay/check` before validation.
///
/// Every field is optional here so that a missing or mistyped `url` can be
/// reported as a validation failure instead of a deserialization error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,

    #[serde(default, alias = "body", skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(default, alias = "timeout", skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passthrough_status: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_fallback_to_get: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_browser_headers: Option<bool>,

    #[serde(default, rename = "insecureTLS", skip_serializing_if = "Option::is_none")]
    pub insecure_tls: Option<bool>,
}

impl CheckRequest {
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(Value::String(url.into())),
            ..Self::default()
        }
    }

    /// Validate and apply defaults.
    pub fn into_descriptor(self, settings: &RelaySettings) -> RelayResult<RequestDescriptor> {
        let url = match self.url {
            Some(Value::String(url)) => parse_target(&url)?,
            _ => return Err(RelayError::validation("Invalid url")),
        };

        let method = match self.method {
            Some(m) => m.parse()?,
            None => RelayMethod::default(),
        };

        let headers = match self.headers {
            Some(raw) => header_map(&raw)?,
            None => HeaderMap::new(),
        };

        let timeout_ms = self.timeout_ms.unwrap_or(settings.default_timeout_ms);
        if timeout_ms == 0 {
            return Err(RelayError::validation("Invalid timeout"));
        }

        Ok(RequestDescriptor {
            url,
            method,
            headers,
            body: self.data.filter(|v| !v.is_null()),
            timeout: Duration::from_millis(timeout_ms),
            passthrough_status: self.passthrough_status.unwrap_or(false),
            head_fallback_to_get: self.head_fallback_to_get.unwrap_or(true),
            send_browser_headers: self.send_browser_headers.unwrap_or(true),
            insecure_tls: self.insecure_tls.unwrap_or(true),
        })
    }
}

/// Parse an absolute http(s) URL.
pub fn parse_target(raw: &str) -> RelayResult<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(RelayError::validation("Invalid url"));
    }
    let url = Url::parse(raw).map_err(|_| RelayError::validation("Invalid url"))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => Err(RelayError::validation("Invalid url")),
    }
}

fn header_map(raw: &BTreeMap<String, String>) -> RelayResult<HeaderMap> {
    let mut headers = HeaderMap::with_capacity(raw.len());
    for (name, value) in raw {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| RelayError::validation(format!("Invalid header: {name}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| RelayError::validation(format!("Invalid header: {name}")))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

/// A validated relay request. Immutable for the duration of one call.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub url: Url,
    pub method: RelayMethod,
    /// Caller headers, overlaid on the computed defaults.
    pub headers: HeaderMap,
    /// Forwarded for methods that allow a body.
    pub body: Option<Value>,
    pub timeout: Duration,
    pub passthrough_status: bool,
    pub head_fallback_to_get: bool,
    pub send_browser_headers: bool,
    pub insecure_tls: bool,
}

impl RequestDescriptor {
    /// A GET descriptor for `url` with every flag at its default.
    pub fn get(url: &str) -> RelayResult<Self> {
        CheckRequest::for_url(url).into_descriptor(&RelaySettings::default())
    }
}

/// Outcome classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayStatus {
    Success,
    Timeout,
    Error,
}

impl RelayStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Timeout => "timeout",
            Self::Error => "error",
        }
    }
}

/// Upstream response details carried by a successful result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseData {
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultData {
    Response(ResponseData),
    Raw(Value),
}

/// The uniform result of a relay call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultDescriptor {
    pub status: RelayStatus,
    pub http_status: Option<u16>,
    pub time_cost_ms: u64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ResultData>,
}

impl ResultDescriptor {
    /// A boundary-level rejection that never reached the engine.
    pub fn rejected(http_status: u16, time_cost_ms: u64, message: impl Into<String>) -> Self {
        Self {
            status: RelayStatus::Error,
            http_status: Some(http_status),
            time_cost_ms,
            message: message.into(),
            data: None,
        }
    }

    /// The upstream body of a successful result.
    pub fn body(&self) -> Option<&Value> {
        match &self.data {
            Some(ResultData::Response(data)) => Some(&data.body),
            _ => None,
        }
    }
}
