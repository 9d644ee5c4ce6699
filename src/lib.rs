//! Service relay library.
//!
//! Forwards caller-described HTTP requests to internal targets that a
//! browser cannot reach directly, and reports the outcome in one uniform
//! shape.

pub mod config;
pub mod http;
pub mod insight;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod relay;
pub mod resilience;

pub use config::RelayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use relay::{RelayEngine, RequestDescriptor, ResultDescriptor};
