//! Optional result analysis.
//!
//! The analyzer is an injected collaborator: the server either holds one
//! behind `Option<Arc<dyn ResultAnalyzer>>` or it does not. There is no
//! global instance.

pub mod heuristic;

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::relay::ResultDescriptor;

pub use heuristic::HeuristicAnalyzer;

/// Error reported when no analyzer is installed.
pub const DISABLED_MESSAGE: &str = "insight capability disabled";

/// Coarse health verdict for one relay result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    Healthy,
    Slow,
    ClientError,
    ServerError,
    Timeout,
    Unreachable,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub verdict: Verdict,
    pub summary: String,
}

/// Capability interface for interpreting relay results.
pub trait ResultAnalyzer: Send + Sync {
    fn analyze(&self, result: &ResultDescriptor) -> Analysis;
}

/// Envelope returned by `POST /relay/analyze`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Analysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

impl InsightResponse {
    pub fn analyzed(analysis: Analysis) -> Self {
        Self {
            success: true,
            data: Some(analysis),
            error: None,
            timestamp: now_millis(),
        }
    }

    pub fn disabled() -> Self {
        Self {
            success: false,
            data: None,
            error: Some(DISABLED_MESSAGE.to_string()),
            timestamp: now_millis(),
        }
    }
}

/// Run `analyzer` if one is installed.
pub fn analyze_with(analyzer: Option<&dyn ResultAnalyzer>, result: &ResultDescriptor) -> InsightResponse {
    match analyzer {
        Some(analyzer) => InsightResponse::analyzed(analyzer.analyze(result)),
        None => InsightResponse::disabled(),
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
