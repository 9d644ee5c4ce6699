//! Boundary status mapping and response construction.
//!
//! # Status policy for `/relay/check`
//! - `passthroughStatus = false`: always 200, real status in the payload
//! - `passthroughStatus = true`: success mirrors the upstream status,
//!   timeout → 504, network error → 502, anything else → upstream status or 500

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::relay::error::NETWORK_ERROR_MESSAGE;
use crate::relay::{ErrorEnvelope, ForwardFailure, ForwardedResponse, RelayStatus, ResultDescriptor};

/// Transport status for a check result.
pub fn check_status(result: &ResultDescriptor, passthrough_status: bool) -> StatusCode {
    if !passthrough_status {
        return StatusCode::OK;
    }

    let code = match result.status {
        RelayStatus::Success => result.http_status.unwrap_or(200),
        RelayStatus::Timeout => 504,
        RelayStatus::Error if result.message == NETWORK_ERROR_MESSAGE => 502,
        RelayStatus::Error => result.http_status.unwrap_or(500),
    };
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_GATEWAY)
}

pub fn check_response(result: ResultDescriptor, passthrough_status: bool) -> Response {
    (check_status(&result, passthrough_status), Json(result)).into_response()
}

/// `/relay/check` rejected before dispatch.
pub fn check_rejected(status: StatusCode, time_cost_ms: u64, message: impl Into<String>) -> Response {
    let body = ResultDescriptor::rejected(status.as_u16(), time_cost_ms, message);
    let mut response = (status, Json(body)).into_response();
    if status == StatusCode::METHOD_NOT_ALLOWED {
        response
            .headers_mut()
            .insert(header::ALLOW, HeaderValue::from_static("POST"));
    }
    response
}

pub fn envelope_response(status: StatusCode, envelope: ErrorEnvelope) -> Response {
    (status, Json(envelope)).into_response()
}

impl IntoResponse for ForwardFailure {
    fn into_response(self) -> Response {
        envelope_response(self.status, self.envelope)
    }
}

impl IntoResponse for ForwardedResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        if let Some(content_type) = self.content_type {
            response.headers_mut().insert(header::CONTENT_TYPE, content_type);
        }
        response
    }
}
