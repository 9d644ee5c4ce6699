//! Endpoint handlers.

use std::time::{Duration, Instant};

use axum::{
    body::Bytes,
    extract::{RawQuery, Request, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

use crate::http::request::request_id;
use crate::http::response::{check_rejected, check_response, envelope_response};
use crate::http::server::AppState;
use crate::insight::{analyze_with, InsightResponse};
use crate::observability::metrics;
use crate::relay::body::OutboundBody;
use crate::relay::descriptor::parse_target;
use crate::relay::passthrough::{decode_path_target, generic_headers, path_headers, GenericRelayRequest};
use crate::relay::{forward_once, CheckRequest, ErrorEnvelope, ForwardRequest, ResultDescriptor};

/// Prefix stripped from the path relay route before decoding the target.
pub const PATH_RELAY_PREFIX: &str = "/relay/path";

/// `POST /relay/check`
pub async fn check(State(state): State<AppState>, method: Method, headers: HeaderMap, body: Bytes) -> Response {
    let started = Instant::now();
    if method != Method::POST {
        return check_rejected(StatusCode::METHOD_NOT_ALLOWED, 0, "Method Not Allowed");
    }

    let request: CheckRequest = if body.is_empty() {
        CheckRequest::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(request) => request,
            Err(e) => {
                return check_rejected(
                    StatusCode::BAD_REQUEST,
                    elapsed_ms(started),
                    format!("Invalid request body: {e}"),
                )
            }
        }
    };

    let config = state.config();
    let mut descriptor = match request.into_descriptor(&config.relay) {
        Ok(descriptor) => descriptor,
        Err(e) => {
            tracing::debug!(request_id = %request_id(&headers), error = %e, "Rejected check request");
            return check_rejected(StatusCode::BAD_REQUEST, elapsed_ms(started), e.to_string());
        }
    };

    // The result must be produced before the server safety timeout fires.
    let cap = config.check_timeout_cap();
    if descriptor.timeout > cap {
        tracing::debug!(
            request_id = %request_id(&headers),
            requested_ms = descriptor.timeout.as_millis() as u64,
            cap_ms = cap.as_millis() as u64,
            "Clamping check deadline"
        );
        descriptor.timeout = cap;
    }

    let result = state.engine(&config).execute(&descriptor).await;
    check_response(result, descriptor.passthrough_status)
}

/// `ANY /relay/proxy?target=<url>`
pub async fn generic_relay(
    State(state): State<AppState>,
    method: Method,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Response {
    if method == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }

    let inbound: Option<Value> = if body.is_empty() {
        None
    } else {
        serde_json::from_slice(&body).ok()
    };
    let envelope: GenericRelayRequest = match &inbound {
        Some(value @ Value::Object(_)) => serde_json::from_value(value.clone()).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "Unrecognized generic relay body, using defaults");
            GenericRelayRequest::default()
        }),
        _ => GenericRelayRequest::default(),
    };

    let query_target = query.as_deref().and_then(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .find(|(key, _)| key == "target")
            .map(|(_, value)| value.into_owned())
    });
    let target = match query_target
        .or(envelope.url.clone())
        .or(envelope.target.clone())
        .map(|raw| parse_target(&raw))
    {
        Some(Ok(target)) => target,
        _ => return envelope_response(StatusCode::BAD_REQUEST, ErrorEnvelope::new("Invalid url")),
    };

    let method = match envelope.method.as_deref() {
        Some(raw) => match Method::from_bytes(raw.trim().to_ascii_uppercase().as_bytes()) {
            Ok(method) => method,
            Err(_) => return envelope_response(StatusCode::BAD_REQUEST, ErrorEnvelope::new("Invalid method")),
        },
        None => method,
    };

    let payload = envelope.body.as_ref().filter(|v| !v.is_null());
    let headers = match generic_headers(&envelope.headers, payload.is_some()) {
        Ok(headers) => headers,
        Err(e) => return envelope_response(StatusCode::BAD_REQUEST, ErrorEnvelope::new(e.to_string())),
    };
    let body = match payload {
        Some(value) => Some(OutboundBody::from_value(value).bytes),
        None if !body.is_empty() => Some(body),
        None => None,
    };

    let config = state.config();
    let request = ForwardRequest {
        target,
        method,
        headers,
        body,
        timeout: Duration::from_millis(
            envelope
                .timeout
                .filter(|t| *t > 0)
                .unwrap_or(config.passthrough.timeout_ms),
        ),
        insecure_tls: envelope
            .insecure_tls
            .unwrap_or(config.passthrough.insecure_tls_default),
    };

    let response = match forward_once(request, &state.proxy_env(), config.relay.max_redirects).await {
        Ok(forwarded) => forwarded.into_response(),
        Err(failure) => failure.into_response(),
    };
    metrics::record_passthrough("generic", response.status().as_u16());
    response
}

/// `ANY /relay/path/<url-encoded-base>/<rest...>`
pub async fn path_relay(State(state): State<AppState>, request: Request) -> Response {
    let config = state.config();
    let (parts, body) = request.into_parts();

    let encoded = parts.uri.path().strip_prefix(PATH_RELAY_PREFIX).unwrap_or_default();
    let target = match decode_path_target(encoded, parts.uri.query()) {
        Ok(target) => target,
        Err(e) => return envelope_response(StatusCode::BAD_REQUEST, ErrorEnvelope::new(e.to_string())),
    };

    let body = match axum::body::to_bytes(body, config.limits.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return envelope_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                ErrorEnvelope::new(format!("Invalid request body: {e}")),
            )
        }
    };

    let request = ForwardRequest {
        target,
        method: parts.method,
        headers: path_headers(&parts.headers, !body.is_empty()),
        body: (!body.is_empty()).then_some(body),
        timeout: Duration::from_millis(config.passthrough.timeout_ms),
        insecure_tls: config.passthrough.insecure_tls_default,
    };

    let response = match forward_once(request, &state.proxy_env(), config.relay.max_redirects).await {
        Ok(forwarded) => forwarded.into_response(),
        Err(failure) => failure.into_response(),
    };
    metrics::record_passthrough("path", response.status().as_u16());
    response
}

/// `POST /relay/analyze`
pub async fn analyze(State(state): State<AppState>, Json(result): Json<ResultDescriptor>) -> Json<InsightResponse> {
    Json(analyze_with(state.analyzer(), &result))
}

#[derive(Serialize)]
pub struct SystemStatus {
    pub status: &'static str,
    pub version: &'static str,
}

/// `GET /healthz`
pub async fn healthz() -> Json<SystemStatus> {
    Json(SystemStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
