//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files, and
//! every table falls back to its `Default` so an empty file is a valid config.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Kept free between the end of a check and the server safety timeout, for
/// client construction and response serialization.
pub const CHECK_HEADROOM_MS: u64 = 250;

/// Root configuration for the relay service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Defaults and limits for the descriptor-based check relay.
    pub relay: RelaySettings,

    /// Settings shared by the generic and path-encoded passthrough relays.
    pub passthrough: PassthroughSettings,

    /// Inbound request limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Optional result-analysis capability.
    pub insight: InsightConfig,

    /// Reload the config file when it changes on disk.
    pub watch: bool,
}

impl RelayConfig {
    /// Longest deadline a check may use so that its worst case, a full
    /// primary attempt plus a fallback at the floor, still finishes inside
    /// the server safety timeout.
    pub fn check_timeout_cap(&self) -> Duration {
        let cap_ms = self
            .limits
            .request_timeout()
            .as_millis()
            .saturating_sub(u128::from(self.relay.fallback_floor_ms + CHECK_HEADROOM_MS));
        Duration::from_millis(u64::try_from(cap_ms).unwrap_or(u64::MAX).max(1))
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Policy knobs for the check relay.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelaySettings {
    /// Deadline applied when a descriptor omits `timeoutMs`.
    pub default_timeout_ms: u64,

    /// Lower bound for the HEAD→GET fallback deadline.
    pub fallback_floor_ms: u64,

    /// Textual bodies longer than this many characters are cut.
    pub truncate_limit: usize,

    /// Appended to a body after it was cut.
    pub truncation_marker: String,

    /// Redirect hops followed before the last response is returned as-is.
    pub max_redirects: usize,

    /// `Accept` sent when browser headers are requested.
    pub browser_accept: String,

    /// `Accept-Language` sent when browser headers are requested.
    pub browser_accept_language: String,

    /// `User-Agent` sent when browser headers are requested.
    pub browser_user_agent: String,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            default_timeout_ms: 8_000,
            fallback_floor_ms: 1_000,
            truncate_limit: 1_000,
            truncation_marker: "...<truncated>".to_string(),
            max_redirects: 5,
            browser_accept:
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8"
                    .to_string(),
            browser_accept_language: "zh-CN,zh;q=0.9,en;q=0.8".to_string(),
            browser_user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36".to_string(),
        }
    }
}

/// Passthrough relay configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PassthroughSettings {
    /// Deadline for a single passthrough request.
    pub timeout_ms: u64,

    /// Whether certificate checks are skipped when the caller does not say.
    pub insecure_tls_default: bool,
}

impl Default for PassthroughSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 15_000,
            insecure_tls_default: true,
        }
    }
}

/// Inbound request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum inbound body size in bytes.
    pub max_body_bytes: usize,

    /// Server-side safety net for a whole inbound request, in seconds.
    pub request_timeout_secs: u64,
}

impl LimitsConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 2 * 1024 * 1024, // 2MB
            request_timeout_secs: 60,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub log_level: String,

    /// Pretty for terminals, JSON for log shipping.
    pub log_format: LogFormat,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "service_relay=info,tower_http=info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Result-analysis capability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InsightConfig {
    /// Install the built-in analyzer at startup.
    pub enabled: bool,

    /// Successful checks slower than this are reported as slow.
    pub slow_threshold_ms: u64,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            slow_threshold_ms: 3_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config: RelayConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.relay.default_timeout_ms, 8_000);
        assert_eq!(config.relay.truncate_limit, 1_000);
        assert_eq!(config.passthrough.timeout_ms, 15_000);
        assert!(config.passthrough.insecure_tls_default);
        assert!(!config.insight.enabled);
        assert!(!config.watch);
    }

    #[test]
    fn partial_tables_keep_remaining_defaults() {
        let config: RelayConfig = toml::from_str(
            r#"
            watch = true

            [relay]
            default_timeout_ms = 2500

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert!(config.watch);
        assert_eq!(config.relay.default_timeout_ms, 2_500);
        assert_eq!(config.relay.fallback_floor_ms, 1_000);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert!(!config.observability.metrics_enabled);
    }

    #[test]
    fn check_cap_leaves_room_for_fallback() {
        let config = RelayConfig::default();
        // 60s safety net, 1s fallback floor, 250ms headroom.
        assert_eq!(config.check_timeout_cap(), Duration::from_millis(58_750));
        assert!(config.check_timeout_cap() > Duration::from_millis(config.relay.default_timeout_ms));
    }

    #[test]
    fn check_cap_never_reaches_zero() {
        let mut config = RelayConfig::default();
        config.limits.request_timeout_secs = 1;
        config.relay.fallback_floor_ms = 5_000;
        assert_eq!(config.check_timeout_cap(), Duration::from_millis(1));
    }
}
