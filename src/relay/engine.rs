//! The relay engine.
//!
//! # Policy, in order
//! 1. Proxy selection from the environment snapshot
//! 2. Certificate policy scoped to a client built for this call only
//! 3. Header composition (browser defaults, then caller overlay)
//! 4. Dispatch with the caller's deadline; every status code is a response
//! 5. HEAD answered 404/405: one GET with the remaining budget
//! 6. Normalization (timing, truncation, failure classification)

use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Method, StatusCode};
use url::Url;

use crate::config::RelaySettings;
use crate::observability::metrics;
use crate::relay::body::OutboundBody;
use crate::relay::client::ClientPolicy;
use crate::relay::descriptor::{RelayMethod, RequestDescriptor, ResultDescriptor};
use crate::relay::error::{RelayError, RelayResult};
use crate::relay::normalize::{Normalizer, UpstreamResponse};
use crate::relay::proxy_env::ProxyEnv;
use crate::resilience::{fallback_budget, with_deadline};

/// Executes request descriptors. Holds configuration only; no state is
/// carried from one call to the next.
#[derive(Debug, Clone)]
pub struct RelayEngine {
    settings: RelaySettings,
    normalizer: Normalizer,
    /// Fixed proxy environment. `None` reads the process env on every call.
    proxy_env: Option<ProxyEnv>,
}

impl Default for RelayEngine {
    fn default() -> Self {
        Self::new(RelaySettings::default())
    }
}

impl RelayEngine {
    pub fn new(settings: RelaySettings) -> Self {
        Self {
            normalizer: Normalizer::from_settings(&settings),
            settings,
            proxy_env: None,
        }
    }

    /// Pin the proxy environment instead of reading it per call.
    pub fn with_proxy_env(mut self, proxy_env: ProxyEnv) -> Self {
        self.proxy_env = Some(proxy_env);
        self
    }

    /// Run one relay call. Never fails: dispatch problems are folded into
    /// the returned descriptor.
    pub async fn execute(&self, descriptor: &RequestDescriptor) -> ResultDescriptor {
        let proxy_env = match &self.proxy_env {
            Some(env) => env.clone(),
            None => ProxyEnv::from_env(),
        };
        let policy = ClientPolicy::for_target(
            &descriptor.url,
            &proxy_env,
            descriptor.insecure_tls,
            self.settings.max_redirects,
        );

        tracing::debug!(
            target_url = %descriptor.url,
            method = %descriptor.method,
            proxied = policy.proxy.is_some(),
            insecure_tls = policy.accept_invalid_certs,
            timeout_ms = descriptor.timeout.as_millis() as u64,
            "Dispatching relay check"
        );

        let client = match policy.build() {
            Ok(client) => client,
            Err(e) => return self.finish(descriptor, Err(e), Duration::ZERO),
        };

        let headers = self.compose_headers(descriptor);
        let body = descriptor
            .body
            .as_ref()
            .filter(|_| descriptor.method.allows_body())
            .map(OutboundBody::from_value);

        let started = Instant::now();
        let mut outcome = dispatch(
            &client,
            descriptor.method.into(),
            &descriptor.url,
            headers.clone(),
            body,
            descriptor.timeout,
        )
        .await;

        if let Ok(response) = &outcome {
            if needs_get_fallback(descriptor, response.status) {
                let budget = fallback_budget(
                    descriptor.timeout,
                    started.elapsed(),
                    Duration::from_millis(self.settings.fallback_floor_ms),
                );
                tracing::debug!(
                    target_url = %descriptor.url,
                    head_status = response.status.as_u16(),
                    budget_ms = budget.as_millis() as u64,
                    "HEAD rejected, retrying as GET"
                );
                metrics::record_head_fallback();
                outcome = dispatch(&client, Method::GET, &descriptor.url, headers, None, budget).await;
            }
        }

        let elapsed = started.elapsed();
        self.finish(descriptor, outcome, elapsed)
    }

    fn finish(
        &self,
        descriptor: &RequestDescriptor,
        outcome: RelayResult<UpstreamResponse>,
        elapsed: Duration,
    ) -> ResultDescriptor {
        let result = match outcome {
            Ok(response) => self.normalizer.success(response, elapsed),
            Err(e) => {
                if let RelayError::Network { detail } = &e {
                    tracing::warn!(target_url = %descriptor.url, detail = %detail, "Relay check could not reach target");
                } else if e.is_timeout() {
                    tracing::warn!(
                        target_url = %descriptor.url,
                        timeout_ms = descriptor.timeout.as_millis() as u64,
                        "Relay check deadline expired"
                    );
                }
                self.normalizer.failure(&e, elapsed)
            }
        };

        tracing::info!(
            target_url = %descriptor.url,
            method = %descriptor.method,
            status = result.status.as_str(),
            http_status = ?result.http_status,
            elapsed_ms = result.time_cost_ms,
            "Relay check finished"
        );
        metrics::record_check(result.status, descriptor.method, elapsed);
        result
    }

    /// Browser-like defaults first (when requested), caller headers on top.
    pub fn compose_headers(&self, descriptor: &RequestDescriptor) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if descriptor.send_browser_headers {
            for (name, value) in [
                (ACCEPT, &self.settings.browser_accept),
                (ACCEPT_LANGUAGE, &self.settings.browser_accept_language),
                (USER_AGENT, &self.settings.browser_user_agent),
            ] {
                if let Ok(value) = HeaderValue::from_str(value) {
                    headers.insert(name, value);
                }
            }
        }

        for name in descriptor.headers.keys() {
            headers.remove(name);
        }
        for (name, value) in &descriptor.headers {
            headers.append(name.clone(), value.clone());
        }
        headers
    }
}

fn needs_get_fallback(descriptor: &RequestDescriptor, status: StatusCode) -> bool {
    descriptor.method == RelayMethod::Head
        && descriptor.head_fallback_to_get
        && matches!(status, StatusCode::NOT_FOUND | StatusCode::METHOD_NOT_ALLOWED)
}

/// One outbound attempt, including reading the whole body, under `deadline`.
async fn dispatch(
    client: &Client,
    method: Method,
    url: &Url,
    mut headers: HeaderMap,
    body: Option<OutboundBody>,
    deadline: Duration,
) -> RelayResult<UpstreamResponse> {
    let mut request = client.request(method, url.clone());
    if let Some(body) = body {
        if body.is_json && !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        request = request.body(body.bytes);
    }
    let request = request.headers(headers);

    with_deadline(deadline, async move {
        let response = request.send().await.map_err(RelayError::from_transport)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                RelayError::Timeout
            } else {
                RelayError::Upstream {
                    message: e.to_string(),
                    status: Some(status.as_u16()),
                }
            }
        })?;
        Ok(UpstreamResponse { status, headers, body })
    })
    .await
}
