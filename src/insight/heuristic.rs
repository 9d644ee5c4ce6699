//! Built-in analyzer: local rules, no network.

use std::time::Duration;

use crate::insight::{Analysis, ResultAnalyzer, Verdict};
use crate::relay::error::NETWORK_ERROR_MESSAGE;
use crate::relay::{RelayStatus, ResultDescriptor};

#[derive(Debug, Clone)]
pub struct HeuristicAnalyzer {
    slow_threshold: Duration,
}

impl HeuristicAnalyzer {
    pub fn new(slow_threshold: Duration) -> Self {
        Self { slow_threshold }
    }
}

impl ResultAnalyzer for HeuristicAnalyzer {
    fn analyze(&self, result: &ResultDescriptor) -> Analysis {
        let elapsed = result.time_cost_ms;
        let (verdict, summary) = match result.status {
            RelayStatus::Timeout => (
                Verdict::Timeout,
                format!("no response within the deadline ({elapsed}ms)"),
            ),
            RelayStatus::Error if result.message == NETWORK_ERROR_MESSAGE => (
                Verdict::Unreachable,
                "target could not be reached: check DNS, routing and proxy settings".to_string(),
            ),
            RelayStatus::Error => (Verdict::Failed, format!("relay failed: {}", result.message)),
            RelayStatus::Success => match result.http_status.unwrap_or(0) {
                code @ 500..=599 => (Verdict::ServerError, format!("target answered {code} after {elapsed}ms")),
                code @ 400..=499 => (Verdict::ClientError, format!("target rejected the request with {code}")),
                code if u128::from(elapsed) > self.slow_threshold.as_millis() => (
                    Verdict::Slow,
                    format!(
                        "target answered {code} but took {elapsed}ms (threshold {}ms)",
                        self.slow_threshold.as_millis()
                    ),
                ),
                code => (Verdict::Healthy, format!("target answered {code} in {elapsed}ms")),
            },
        };
        Analysis { verdict, summary }
    }
}
