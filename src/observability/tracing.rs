//! Request spans.
//!
//! Every inbound request gets one span carrying its `x-request-id`, so
//! relay log lines can be correlated with the access log.

use axum::http::Request;
use tower_http::trace::{HttpMakeClassifier, MakeSpan, TraceLayer};

use crate::http::request::X_REQUEST_ID;

/// Span factory for [`TraceLayer`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RelaySpan;

impl<B> MakeSpan<B> for RelaySpan {
    fn make_span(&mut self, request: &Request<B>) -> ::tracing::Span {
        let request_id = request
            .headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown");

        ::tracing::info_span!(
            "request",
            request_id = %request_id,
            method = %request.method(),
            path = %request.uri().path(),
        )
    }
}

/// HTTP trace layer using [`RelaySpan`].
pub fn trace_layer() -> TraceLayer<HttpMakeClassifier, RelaySpan> {
    TraceLayer::new_for_http().make_span_with(RelaySpan)
}
