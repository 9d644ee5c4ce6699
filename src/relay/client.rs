//! Per-call outbound client construction.
//!
//! Every relay call gets its own `reqwest::Client`, carrying that call's
//! proxy and certificate policy. The client is dropped when the call ends,
//! which closes its connections; nothing is pooled across calls.

use reqwest::redirect::Policy;
use reqwest::{Client, Proxy};
use url::Url;

use crate::relay::error::{RelayError, RelayResult};
use crate::relay::proxy_env::ProxyEnv;

/// Connection policy for one outbound call.
#[derive(Debug, Clone, Default)]
pub struct ClientPolicy {
    /// Explicit proxy URL. `None` connects directly.
    pub proxy: Option<String>,
    /// Skip certificate verification.
    pub accept_invalid_certs: bool,
    pub max_redirects: usize,
}

impl ClientPolicy {
    /// Derive the policy for `target` from the proxy environment.
    ///
    /// Certificate checks are only relaxed for https targets.
    pub fn for_target(target: &Url, proxy_env: &ProxyEnv, insecure_tls: bool, max_redirects: usize) -> Self {
        Self {
            proxy: proxy_env.select(target).map(str::to_owned),
            accept_invalid_certs: insecure_tls && target.scheme() == "https",
            max_redirects,
        }
    }

    /// Build a client that honors exactly this policy.
    pub fn build(&self) -> RelayResult<Client> {
        // Environment proxies are resolved by ProxyEnv, not by reqwest.
        let mut builder = Client::builder()
            .no_proxy()
            .pool_max_idle_per_host(0)
            .redirect(if self.max_redirects == 0 {
                Policy::none()
            } else {
                Policy::limited(self.max_redirects)
            })
            .danger_accept_invalid_certs(self.accept_invalid_certs);

        if let Some(proxy_url) = &self.proxy {
            let proxy = Proxy::all(proxy_url).map_err(|e| RelayError::Upstream {
                message: format!("invalid proxy {proxy_url}: {e}"),
                status: None,
            })?;
            builder = builder.proxy(proxy);
        }

        builder.build().map_err(|e| RelayError::Upstream {
            message: e.to_string(),
            status: None,
        })
    }
}
