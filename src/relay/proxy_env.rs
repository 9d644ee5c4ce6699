//! Corporate proxy selection from `HTTPS_PROXY` / `HTTP_PROXY` / `NO_PROXY`.
//!
//! The environment is snapshotted into a [`ProxyEnv`] value per call. Nothing
//! here mutates process state.

use url::Url;

/// Snapshot of the proxy-related environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyEnv {
    https_proxy: Option<String>,
    http_proxy: Option<String>,
    no_proxy: Vec<String>,
}

impl ProxyEnv {
    /// Read the current process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Upper-case names win over
    /// lower-case ones; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |upper: &str, lower: &str| {
            lookup(upper)
                .filter(|v| !v.trim().is_empty())
                .or_else(|| lookup(lower).filter(|v| !v.trim().is_empty()))
                .map(|v| v.trim().to_string())
        };

        let no_proxy = read("NO_PROXY", "no_proxy")
            .map(|list| {
                list.split(',')
                    .map(|s| s.trim().to_ascii_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            https_proxy: read("HTTPS_PROXY", "https_proxy"),
            http_proxy: read("HTTP_PROXY", "http_proxy"),
            no_proxy,
        }
    }

    /// True when `host` equals or ends with any `NO_PROXY` entry.
    pub fn bypasses(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.no_proxy
            .iter()
            .any(|entry| host == *entry || host.ends_with(entry.as_str()))
    }

    /// Proxy URL to use for `target`, if any.
    ///
    /// https targets prefer `HTTPS_PROXY`, everything else prefers
    /// `HTTP_PROXY`; either falls back to the other variable.
    pub fn select(&self, target: &Url) -> Option<&str> {
        let host = target.host_str()?;
        if self.bypasses(host) {
            return None;
        }

        let (preferred, fallback) = if target.scheme() == "https" {
            (&self.https_proxy, &self.http_proxy)
        } else {
            (&self.http_proxy, &self.https_proxy)
        };

        preferred.as_deref().or(fallback.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> ProxyEnv {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ProxyEnv::from_lookup(|key| map.get(key).cloned())
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn no_variables_means_no_proxy() {
        assert_eq!(env(&[]).select(&url("https://svc.corp")), None);
    }

    #[test]
    fn scheme_picks_preferred_variable() {
        let proxies = env(&[
            ("HTTPS_PROXY", "http://secure-gw:3128"),
            ("HTTP_PROXY", "http://plain-gw:3128"),
        ]);
        assert_eq!(proxies.select(&url("https://a.corp")), Some("http://secure-gw:3128"));
        assert_eq!(proxies.select(&url("http://a.corp")), Some("http://plain-gw:3128"));
    }

    #[test]
    fn falls_back_to_other_variable() {
        let only_http = env(&[("http_proxy", "http://plain-gw:3128")]);
        assert_eq!(only_http.select(&url("https://a.corp")), Some("http://plain-gw:3128"));

        let only_https = env(&[("https_proxy", "http://secure-gw:3128")]);
        assert_eq!(only_https.select(&url("http://a.corp")), Some("http://secure-gw:3128"));
    }

    #[test]
    fn upper_case_wins_and_empty_is_unset() {
        let proxies = env(&[
            ("HTTPS_PROXY", ""),
            ("https_proxy", "http://lower:1"),
            ("HTTP_PROXY", "http://upper:2"),
            ("http_proxy", "http://lower:2"),
        ]);
        assert_eq!(proxies.select(&url("https://x.y")), Some("http://lower:1"));
        assert_eq!(proxies.select(&url("http://x.y")), Some("http://upper:2"));
    }

    #[test]
    fn no_proxy_matches_exact_and_suffix() {
        let proxies = env(&[
            ("HTTP_PROXY", "http://gw:3128"),
            ("NO_PROXY", " localhost , .internal,example.com,, "),
        ]);
        assert_eq!(proxies.select(&url("http://localhost:8080/x")), None);
        assert_eq!(proxies.select(&url("http://billing.internal/")), None);
        assert_eq!(proxies.select(&url("http://api.example.com/")), None);
        assert_eq!(proxies.select(&url("http://EXAMPLE.com/")), None);
        assert_eq!(proxies.select(&url("http://example.org/")), Some("http://gw:3128"));
    }
}
