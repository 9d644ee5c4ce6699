//! Deadline arithmetic for relay attempts.
//!
//! # Responsibilities
//! - Wrap outbound attempts with a deadline
//! - Compute the budget left for the HEAD→GET fallback
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors
//! - The fallback never gets less than a fixed floor, even when the
//!   primary attempt consumed the whole budget

use std::future::Future;
use std::time::Duration;

use crate::relay::error::{RelayError, RelayResult};

/// Deadline for the fallback attempt: whatever is left of `total` after
/// `elapsed`, but never less than `floor`.
pub fn fallback_budget(total: Duration, elapsed: Duration, floor: Duration) -> Duration {
    total.saturating_sub(elapsed).max(floor)
}

/// Run `attempt`, mapping an expired deadline to [`RelayError::Timeout`].
pub async fn with_deadline<F, T>(deadline: Duration, attempt: F) -> RelayResult<T>
where
    F: Future<Output = RelayResult<T>>,
{
    match tokio::time::timeout(deadline, attempt).await {
        Ok(outcome) => outcome,
        Err(_) => Err(RelayError::Timeout),
    }
}
