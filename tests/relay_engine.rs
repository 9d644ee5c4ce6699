//! Relay engine behavior against live mock backends.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use service_relay::relay::{ProxyEnv, RelayEngine, RelayMethod, RelayStatus, RequestDescriptor, ResultData};

mod common;

use common::{MockReply, MockRequest};

fn engine() -> RelayEngine {
    RelayEngine::default().with_proxy_env(ProxyEnv::default())
}

fn descriptor(url: String) -> RequestDescriptor {
    RequestDescriptor::get(&url).unwrap()
}

#[tokio::test]
async fn test_reachable_target_is_success() {
    let addr = common::start_mock_backend(MockReply::json(200, r#"{"healthy":true}"#)).await;

    let result = engine().execute(&descriptor(format!("http://{}/health", addr))).await;

    assert_eq!(result.status, RelayStatus::Success);
    assert_eq!(result.http_status, Some(200));
    assert_eq!(result.message, "ok");
    match result.data {
        Some(ResultData::Response(data)) => {
            assert_eq!(data.status_text, "OK");
            assert_eq!(data.body, json!({ "healthy": true }));
            assert_eq!(data.headers["content-type"], "application/json");
        }
        other => panic!("expected response data, got {other:?}"),
    }
}

#[tokio::test]
async fn test_upstream_server_error_is_still_success() {
    let addr = common::start_mock_backend(MockReply::text(500, "boom")).await;

    let result = engine().execute(&descriptor(format!("http://{}/", addr))).await;

    assert_eq!(result.status, RelayStatus::Success);
    assert_eq!(result.http_status, Some(500));
    assert_eq!(result.body(), Some(&json!("boom")));
}

#[tokio::test]
async fn test_head_falls_back_to_get() {
    let methods = Arc::new(Mutex::new(Vec::new()));
    let seen = methods.clone();
    let addr = common::start_programmable_backend(move |req: MockRequest| {
        seen.lock().unwrap().push(req.method.clone());
        async move {
            if req.method == "HEAD" {
                MockReply::text(405, "").delayed(Duration::from_millis(150))
            } else {
                MockReply::text(200, "alive").delayed(Duration::from_millis(150))
            }
        }
    })
    .await;

    let mut head = descriptor(format!("http://{}/", addr));
    head.method = RelayMethod::Head;
    let result = engine().execute(&head).await;

    assert_eq!(result.status, RelayStatus::Success);
    assert_eq!(result.http_status, Some(200));
    assert_eq!(result.body(), Some(&json!("alive")));
    assert!(result.time_cost_ms >= 300, "both attempts should be timed, got {}ms", result.time_cost_ms);
    assert_eq!(*methods.lock().unwrap(), vec!["HEAD".to_string(), "GET".to_string()]);
}

#[tokio::test]
async fn test_head_without_fallback_keeps_405() {
    let calls = Arc::new(AtomicU32::new(0));
    let cc = calls.clone();
    let addr = common::start_programmable_backend(move |_| {
        cc.fetch_add(1, Ordering::SeqCst);
        async { MockReply::text(405, "") }
    })
    .await;

    let mut head = descriptor(format!("http://{}/", addr));
    head.method = RelayMethod::Head;
    head.head_fallback_to_get = false;
    let result = engine().execute(&head).await;

    assert_eq!(result.status, RelayStatus::Success);
    assert_eq!(result.http_status, Some(405));
    assert_eq!(calls.load(Ordering::SeqCst), 1, "no second request expected");
}

#[tokio::test]
async fn test_silent_target_times_out() {
    let addr = common::start_silent_backend().await;

    let mut request = descriptor(format!("http://{}/", addr));
    request.timeout = Duration::from_millis(300);
    let result = engine().execute(&request).await;

    assert_eq!(result.status, RelayStatus::Timeout);
    assert_eq!(result.message, "timeout");
    assert_eq!(result.http_status, None);
    assert!(result.time_cost_ms >= 300);
    assert!(result.time_cost_ms < 5_000);
}

#[tokio::test]
async fn test_refused_connection_is_network_error() {
    let addr = common::closed_port().await;

    let result = engine().execute(&descriptor(format!("http://{}/", addr))).await;

    assert_eq!(result.status, RelayStatus::Error);
    assert_eq!(result.message, "network error");
    assert_eq!(result.http_status, None);
}

#[tokio::test]
async fn test_long_text_body_is_truncated() {
    let addr = common::start_mock_backend(MockReply::text(200, "a".repeat(5000))).await;

    let result = engine().execute(&descriptor(format!("http://{}/", addr))).await;

    let body = result.body().and_then(|b| b.as_str()).unwrap();
    assert!(body.ends_with("...<truncated>"));
    assert!(body.len() <= 1000 + "...<truncated>".len());
}

#[tokio::test]
async fn test_browser_headers_and_caller_overrides_reach_target() {
    let captured = Arc::new(Mutex::new(None));
    let slot = captured.clone();
    let addr = common::start_programmable_backend(move |req: MockRequest| {
        *slot.lock().unwrap() = Some(req);
        async { MockReply::text(200, "") }
    })
    .await;

    let mut request = descriptor(format!("http://{}/", addr));
    request
        .headers
        .insert("user-agent", "relay-check/1.0".parse().unwrap());
    engine().execute(&request).await;

    let seen = captured.lock().unwrap().clone().unwrap();
    assert_eq!(seen.header("user-agent"), Some("relay-check/1.0"));
    assert_eq!(seen.header("accept-language"), Some("zh-CN,zh;q=0.9,en;q=0.8"));
    assert!(seen.header("accept").unwrap().starts_with("text/html"));
}

#[tokio::test]
async fn test_post_body_is_forwarded_as_json() {
    let captured = Arc::new(Mutex::new(None));
    let slot = captured.clone();
    let addr = common::start_programmable_backend(move |req: MockRequest| {
        *slot.lock().unwrap() = Some(req);
        async { MockReply::json(201, "{}") }
    })
    .await;

    let mut request = descriptor(format!("http://{}/items", addr));
    request.method = RelayMethod::Post;
    request.body = Some(json!({ "name": "widget" }));
    let result = engine().execute(&request).await;

    assert_eq!(result.http_status, Some(201));
    let seen = captured.lock().unwrap().clone().unwrap();
    assert_eq!(seen.method, "POST");
    assert_eq!(seen.target, "/items");
    assert_eq!(seen.header("content-type"), Some("application/json"));
    assert_eq!(seen.body, br#"{"name":"widget"}"#);
}

#[tokio::test]
async fn test_get_never_sends_a_body() {
    let captured = Arc::new(Mutex::new(None));
    let slot = captured.clone();
    let addr = common::start_programmable_backend(move |req: MockRequest| {
        *slot.lock().unwrap() = Some(req);
        async { MockReply::text(200, "") }
    })
    .await;

    let mut request = descriptor(format!("http://{}/", addr));
    request.body = Some(json!({ "ignored": true }));
    engine().execute(&request).await;

    let seen = captured.lock().unwrap().clone().unwrap();
    assert!(seen.body.is_empty());
}

#[tokio::test]
async fn test_concurrent_calls_keep_their_own_outcomes() {
    let fast = common::start_mock_backend(MockReply::text(200, "fast")).await;
    let silent = common::start_silent_backend().await;

    let engine = engine();
    let mut slow_request = descriptor(format!("http://{}/", silent));
    slow_request.timeout = Duration::from_millis(200);
    let fast_request = descriptor(format!("http://{}/", fast));

    let (slow, quick) = tokio::join!(engine.execute(&slow_request), engine.execute(&fast_request));

    assert_eq!(slow.status, RelayStatus::Timeout);
    assert_eq!(quick.status, RelayStatus::Success);
    assert_eq!(quick.body(), Some(&json!("fast")));
}

#[tokio::test]
async fn test_concurrent_tls_policies_do_not_leak() {
    let addr = common::start_tls_backend("secure hello").await;
    let url = format!("https://127.0.0.1:{}/", addr.port());

    let engine = engine();
    let mut lenient = descriptor(url.clone());
    lenient.insecure_tls = true;
    let mut strict = descriptor(url);
    strict.insecure_tls = false;

    for _ in 0..3 {
        let (lenient_result, strict_result) = tokio::join!(engine.execute(&lenient), engine.execute(&strict));

        assert_eq!(lenient_result.status, RelayStatus::Success);
        assert_eq!(lenient_result.http_status, Some(200));
        assert_eq!(lenient_result.body(), Some(&json!("secure hello")));

        assert_eq!(strict_result.status, RelayStatus::Error);
        assert_eq!(strict_result.message, "network error");
        assert_eq!(strict_result.http_status, None);
    }
}
