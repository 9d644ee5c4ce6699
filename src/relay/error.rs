//! Relay error taxonomy.

use thiserror::Error;

/// Message used for every transport-level failure without a response.
pub const NETWORK_ERROR_MESSAGE: &str = "network error";

/// Message used when a deadline expires.
pub const TIMEOUT_MESSAGE: &str = "timeout";

/// Everything that can go wrong between receiving a descriptor and
/// producing a result.
///
/// Only [`RelayError::Validation`] ever reaches a caller as an error; the
/// engine folds the other variants into a result descriptor.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Malformed input, rejected before anything is dispatched.
    #[error("{0}")]
    Validation(String),

    /// Deadline exceeded on the primary or fallback attempt.
    #[error("timeout")]
    Timeout,

    /// DNS, connect, TLS handshake or connection reset.
    #[error("network error")]
    Network { detail: String },

    /// Anything else. `status` is set when response headers already arrived.
    #[error("{message}")]
    Upstream { message: String, status: Option<u16> },
}

impl RelayError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Classify a transport error raised by the outbound client.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() || err.is_request() {
            Self::Network {
                detail: err.to_string(),
            }
        } else {
            Self::Upstream {
                message: err.to_string(),
                status: err.status().map(|s| s.as_u16()),
            }
        }
    }

    /// Upstream status code observed before the failure, if any.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => *status,
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

pub type RelayResult<T> = Result<T, RelayError>;
