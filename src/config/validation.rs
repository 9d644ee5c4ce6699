//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, limits > 0)
//! - Check that addresses parse and TLS files are named
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::config::schema::{RelayConfig, CHECK_HEADROOM_MS};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check a parsed config, collecting every problem found.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("not a socket address: {}", config.listener.bind_address),
        ));
    }

    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.trim().is_empty() {
            errors.push(ValidationError::new("listener.tls.cert_path", "must not be empty"));
        }
        if tls.key_path.trim().is_empty() {
            errors.push(ValidationError::new("listener.tls.key_path", "must not be empty"));
        }
    }

    let relay = &config.relay;
    if relay.default_timeout_ms == 0 {
        errors.push(ValidationError::new("relay.default_timeout_ms", "must be greater than 0"));
    }
    if relay.fallback_floor_ms > relay.default_timeout_ms {
        errors.push(ValidationError::new(
            "relay.fallback_floor_ms",
            "must not exceed relay.default_timeout_ms",
        ));
    }
    if config.limits.request_timeout_secs > 0
        && relay.default_timeout_ms > 0
        && Duration::from_millis(relay.default_timeout_ms) > config.check_timeout_cap()
    {
        errors.push(ValidationError::new(
            "relay.default_timeout_ms",
            format!(
                "default_timeout_ms + fallback_floor_ms + {CHECK_HEADROOM_MS}ms must fit inside limits.request_timeout_secs"
            ),
        ));
    }
    if relay.truncate_limit == 0 {
        errors.push(ValidationError::new("relay.truncate_limit", "must be greater than 0"));
    }

    if config.passthrough.timeout_ms == 0 {
        errors.push(ValidationError::new("passthrough.timeout_ms", "must be greater than 0"));
    }

    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::new("limits.max_body_bytes", "must be greater than 0"));
    }
    if config.limits.request_timeout_secs == 0 {
        errors.push(ValidationError::new("limits.request_timeout_secs", "must be greater than 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("not a socket address: {}", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
