//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!     → tracing.rs (one span per inbound request, keyed by request id)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Headers and bodies are never logged, only targets and outcomes
//! - Request ID flows through all log lines of a request

pub mod logging;
pub mod metrics;
pub mod tracing;

pub use logging::init_logging;
