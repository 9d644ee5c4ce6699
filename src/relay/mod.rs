//! Relay subsystem: forwards caller-described requests to internal targets.
//!
//! # Data Flow
//! ```text
//! CheckRequest (boundary JSON)
//!     → descriptor.rs (validate, apply defaults) → RequestDescriptor
//!     → engine.rs
//!         → proxy_env.rs (HTTPS_PROXY / HTTP_PROXY / NO_PROXY)
//!         → client.rs (client built for this call: proxy + cert policy)
//!         → dispatch, optional HEAD→GET fallback
//!     → normalize.rs (classify, truncate, time) → ResultDescriptor
//!
//! Generic / path-encoded relay:
//!     → passthrough.rs (one request, verbatim status + body)
//! ```
//!
//! # Design Decisions
//! - Certificate verification is configured on a per-call client; no
//!   process-wide toggle exists anywhere
//! - Upstream 4xx/5xx are successful relays; only transport failures are errors
//! - Only validation errors escape to the boundary

pub mod body;
pub mod client;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod normalize;
pub mod passthrough;
pub mod proxy_env;

pub use descriptor::{
    CheckRequest, RelayMethod, RelayStatus, RequestDescriptor, ResponseData, ResultData, ResultDescriptor,
};
pub use engine::RelayEngine;
pub use error::{RelayError, RelayResult};
pub use normalize::Normalizer;
pub use passthrough::{forward_once, ErrorEnvelope, ForwardFailure, ForwardRequest, ForwardedResponse};
pub use proxy_env::ProxyEnv;
