//! Passthrough relays.
//!
//! Unlike the engine these do no classification, truncation or fallback:
//! one request goes out and the upstream status and body come back
//! verbatim. Transport failures become an [`ErrorEnvelope`].

use std::time::{Duration, Instant};

use axum::body::Bytes;
use percent_encoding::percent_decode_str;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_ENCODING, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::relay::client::ClientPolicy;
use crate::relay::error::{RelayError, RelayResult};
use crate::relay::proxy_env::ProxyEnv;
use crate::resilience::with_deadline;

/// `Accept` sent by both passthrough relays unless the caller overrides it.
pub const PASSTHROUGH_ACCEPT: &str = "application/json, text/plain, */*";

/// One passthrough request, fully resolved.
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    pub target: Url,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub timeout: Duration,
    pub insecure_tls: bool,
}

/// Upstream answer, returned to the caller as-is.
#[derive(Debug, Clone)]
pub struct ForwardedResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

/// Fixed-shape body for passthrough failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl ErrorEnvelope {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error: None,
        }
    }
}

/// A failed passthrough: HTTP status to answer with, plus the envelope.
#[derive(Debug, Clone)]
pub struct ForwardFailure {
    pub status: StatusCode,
    pub envelope: ErrorEnvelope,
}

impl From<RelayError> for ForwardFailure {
    fn from(err: RelayError) -> Self {
        let status = err
            .upstream_status()
            .and_then(|s| StatusCode::from_u16(s).ok())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let message = match err.to_string() {
            m if m.is_empty() => "proxy error".to_string(),
            m => m,
        };
        Self {
            status,
            envelope: ErrorEnvelope::new(message),
        }
    }
}

/// Issue exactly one request and hand back what the upstream said.
pub async fn forward_once(
    request: ForwardRequest,
    proxy_env: &ProxyEnv,
    max_redirects: usize,
) -> Result<ForwardedResponse, ForwardFailure> {
    let started = Instant::now();
    let target = request.target.clone();
    let method = request.method.clone();

    let outcome = send(request, proxy_env, max_redirects).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;
    match &outcome {
        Ok(response) => tracing::info!(
            target_url = %target,
            method = %method,
            status = response.status.as_u16(),
            elapsed_ms,
            "Passthrough finished"
        ),
        Err(e) => tracing::warn!(
            target_url = %target,
            method = %method,
            error = %e,
            elapsed_ms,
            "Passthrough failed"
        ),
    }
    outcome.map_err(ForwardFailure::from)
}

async fn send(request: ForwardRequest, proxy_env: &ProxyEnv, max_redirects: usize) -> RelayResult<ForwardedResponse> {
    let client = ClientPolicy::for_target(&request.target, proxy_env, request.insecure_tls, max_redirects).build()?;

    let mut builder = client
        .request(request.method, request.target)
        .headers(request.headers);
    if let Some(body) = request.body {
        builder = builder.body(body);
    }

    with_deadline(request.timeout, async move {
        let response = builder.send().await.map_err(RelayError::from_transport)?;
        let status = response.status();
        let content_type = response.headers().get(CONTENT_TYPE).cloned();
        let body = response.bytes().await.map_err(|e| RelayError::Upstream {
            message: e.to_string(),
            status: Some(status.as_u16()),
        })?;
        Ok(ForwardedResponse {
            status,
            content_type,
            body,
        })
    })
    .await
}

/// JSON body accepted by the generic relay. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenericRelayRequest {
    pub url: Option<String>,
    pub target: Option<String>,
    pub method: Option<String>,
    #[serde(default)]
    pub headers: std::collections::BTreeMap<String, String>,
    pub body: Option<Value>,
    #[serde(alias = "timeoutMs")]
    pub timeout: Option<u64>,
    #[serde(rename = "insecureTLS")]
    pub insecure_tls: Option<bool>,
}

/// Headers for the generic relay: minimal defaults, caller overlay, and
/// never a stale `content-length` or `accept-encoding` from the caller.
pub fn generic_headers(caller: &std::collections::BTreeMap<String, String>, has_json_body: bool) -> RelayResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(PASSTHROUGH_ACCEPT));
    if has_json_body {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }

    for (name, value) in caller {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| RelayError::validation(format!("Invalid header: {name}")))?;
        if name == CONTENT_LENGTH || name == ACCEPT_ENCODING {
            continue;
        }
        let value = HeaderValue::from_str(value)
            .map_err(|_| RelayError::validation(format!("Invalid header: {name}")))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

/// Collapse `Bearer "token"` into `Bearer token`; anything else is trimmed
/// and kept.
pub fn normalize_bearer(raw: &str) -> String {
    let trimmed = raw.trim();
    let quoted = trimmed
        .strip_prefix("Bearer")
        .filter(|rest| rest.starts_with(char::is_whitespace))
        .map(str::trim_start)
        .and_then(|rest| rest.strip_prefix('"'))
        .and_then(|rest| rest.strip_suffix('"'))
        .filter(|token| !token.is_empty());

    match quoted {
        Some(token) => format!("Bearer {token}"),
        None => trimmed.to_string(),
    }
}

/// Target of a path-encoded relay: `<url-encoded-base>/<rest...>`, plus the
/// inbound query string.
pub fn decode_path_target(encoded_path: &str, query: Option<&str>) -> RelayResult<Url> {
    let mut segments = encoded_path.trim_start_matches('/').splitn(2, '/');
    let encoded_base = segments.next().unwrap_or_default();
    if encoded_base.is_empty() {
        return Err(RelayError::validation("Missing encoded base in path"));
    }

    let base = percent_decode_str(encoded_base)
        .decode_utf8()
        .map_err(|_| RelayError::validation("Invalid encoded base"))?;

    let rest = segments.next().unwrap_or_default();
    let mut target = if rest.is_empty() {
        base.into_owned()
    } else {
        format!("{}/{}", base.trim_end_matches('/'), rest)
    };

    if let Some(query) = query.filter(|q| !q.is_empty()) {
        target.push(if target.contains('?') { '&' } else { '?' });
        target.push_str(query);
    }

    crate::relay::descriptor::parse_target(&target)
        .map_err(|_| RelayError::validation("Invalid encoded base"))
}

/// Headers for the path relay. The inbound content type is kept verbatim
/// so multipart boundaries still match the raw body.
pub fn path_headers(inbound: &HeaderMap, has_body: bool) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(PASSTHROUGH_ACCEPT));

    match inbound.get(CONTENT_TYPE) {
        Some(content_type) => {
            headers.insert(CONTENT_TYPE, content_type.clone());
        }
        None if has_body => {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        None => {}
    }

    if let Some(auth) = inbound.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        if let Ok(value) = HeaderValue::from_str(&normalize_bearer(auth)) {
            headers.insert(AUTHORIZATION, value);
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn bearer_quotes_are_stripped() {
        assert_eq!(normalize_bearer(r#"Bearer "abc.def""#), "Bearer abc.def");
        assert_eq!(normalize_bearer(r#"  Bearer    "abc"  "#), "Bearer abc");
        assert_eq!(normalize_bearer("Bearer abc"), "Bearer abc");
        assert_eq!(normalize_bearer(r#"Bearer """#), r#"Bearer """#);
        assert_eq!(normalize_bearer(r#"Basic "abc""#), r#"Basic "abc""#);
        assert_eq!(normalize_bearer(r#"Bearer"abc""#), r#"Bearer"abc""#);
    }

    #[test]
    fn path_target_joins_rest_and_query() {
        let url = decode_path_target("http%3A%2F%2Fsvc.internal%3A8080%2Fapi%2F/v1/users", Some("page=2")).unwrap();
        assert_eq!(url.as_str(), "http://svc.internal:8080/api/v1/users?page=2");

        let url = decode_path_target("http%3A%2F%2Fsvc.internal%2Fhealth", None).unwrap();
        assert_eq!(url.as_str(), "http://svc.internal/health");

        let url = decode_path_target("http%3A%2F%2Fsvc.internal%2Fq%3Fa%3D1", Some("b=2")).unwrap();
        assert_eq!(url.as_str(), "http://svc.internal/q?a=1&b=2");
    }

    #[test]
    fn path_target_errors() {
        let missing = decode_path_target("", None).unwrap_err();
        assert_eq!(missing.to_string(), "Missing encoded base in path");

        let invalid = decode_path_target("%FF%FE/x", None).unwrap_err();
        assert_eq!(invalid.to_string(), "Invalid encoded base");

        let relative = decode_path_target("not-a-url", None).unwrap_err();
        assert_eq!(relative.to_string(), "Invalid encoded base");
    }

    #[test]
    fn generic_headers_drop_length_and_encoding() {
        let caller: BTreeMap<String, String> = [
            ("Content-Length", "999"),
            ("Accept-Encoding", "br"),
            ("Accept", "text/csv"),
            ("X-Team", "infra"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let headers = generic_headers(&caller, true).unwrap();
        assert!(!headers.contains_key(CONTENT_LENGTH));
        assert!(!headers.contains_key(ACCEPT_ENCODING));
        assert_eq!(headers[ACCEPT], "text/csv");
        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert_eq!(headers["x-team"], "infra");
    }

    #[test]
    fn path_headers_keep_multipart_content_type() {
        let mut inbound = HeaderMap::new();
        inbound.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("multipart/form-data; boundary=----relay42"),
        );
        inbound.insert(AUTHORIZATION, HeaderValue::from_static(r#"Bearer "tok""#));
        inbound.insert("cookie", HeaderValue::from_static("session=1"));

        let headers = path_headers(&inbound, true);
        assert_eq!(headers[CONTENT_TYPE], "multipart/form-data; boundary=----relay42");
        assert_eq!(headers[AUTHORIZATION], "Bearer tok");
        assert!(!headers.contains_key("cookie"));
    }

    #[test]
    fn failures_default_to_500() {
        let failure = ForwardFailure::from(RelayError::Timeout);
        assert_eq!(failure.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(failure.envelope.message, "timeout");

        let partial = ForwardFailure::from(RelayError::Upstream {
            message: "body error".into(),
            status: Some(502),
        });
        assert_eq!(partial.status, StatusCode::BAD_GATEWAY);
    }
}
