//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Relay attempt:
//!     → timeouts.rs (enforce the per-attempt deadline)
//!     → HEAD answered 404/405: timeouts.rs (budget for the single GET fallback)
//! ```
//!
//! # Design Decisions
//! - Every outbound call has a deadline
//! - At most one extra attempt (HEAD→GET); no retries, backoff or circuit breaking

pub mod timeouts;

pub use timeouts::{fallback_budget, with_deadline};
