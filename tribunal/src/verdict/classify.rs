//! Verdict classification — three resolved slots into one verdict.
//!
//! Pure and total: classification never fails, regardless of how many
//! slots failed or which aggregate fields the backend omitted. Every
//! field follows an explicit, ordered precedence documented on
//! [`classify`].

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::decision::{degraded_decision, Decision, HardFlag};
use super::severity::{resolve_severity, SeverityTier};
use crate::events::{BackendAggregate, WorkerResult};

/// The single deterministic outcome of a judgment session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub decision: Decision,
    pub severity_tier: SeverityTier,
    /// Resolved severity score, 0–100.
    pub severity_score: f64,
    /// Weighted decision score, 0.0–3.0.
    pub total_score: f64,
    /// Non-none flags from successful slots, in slot order; duplicates
    /// retained for audit traceability.
    pub hard_flags: Vec<HardFlag>,
    pub reasoning: String,
}

impl Verdict {
    /// Compact status line.
    pub fn summary_line(&self) -> String {
        format!(
            "{} | severity {:.1} ({}) | score {:.1} | flags: {}",
            self.decision,
            self.severity_score,
            self.severity_tier,
            self.total_score,
            if self.hard_flags.is_empty() {
                "none".to_string()
            } else {
                self.hard_flags
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            }
        )
    }
}

/// Classify three resolved slot results into a verdict.
///
/// Field precedence (backend-supplied values always win over
/// client-recomputed fallbacks):
/// - decision: backend token (total mapping) > weighted client policy
/// - severity score: backend `judgment_severity` > mean over successes > 0
/// - severity tier: fixed thresholds on the resolved score
/// - total score: backend `total_score` > numeric extraction from the
///   reasoning text > 0
/// - reasoning: backend text > synthesized score summary
pub fn classify(results: &[WorkerResult; 3], aggregate: Option<&BackendAggregate>) -> Verdict {
    let severity_score = resolve_severity(results, aggregate.and_then(|a| a.judgment_severity));
    let severity_tier = SeverityTier::from_score(severity_score);
    let hard_flags = collect_hard_flags(results);

    let verdict = match aggregate {
        Some(aggregate) => {
            let decision = Decision::from_token(&aggregate.result);
            let total_score = aggregate
                .total_score
                .unwrap_or_else(|| extract_score(&aggregate.reasoning));
            Verdict {
                decision,
                severity_tier,
                severity_score,
                total_score,
                hard_flags,
                reasoning: aggregate.reasoning.clone(),
            }
        }
        None => {
            let (decision, total_score, reasoning) =
                degraded_decision(results, severity_tier, &hard_flags);
            Verdict {
                decision,
                severity_tier,
                severity_score,
                total_score,
                hard_flags,
                reasoning,
            }
        }
    };

    debug!(summary = %verdict.summary_line(), "classified verdict");
    verdict
}

/// Collect non-none hard flags from successful slots in fixed slot order.
fn collect_hard_flags(results: &[WorkerResult; 3]) -> Vec<HardFlag> {
    results
        .iter()
        .filter_map(WorkerResult::response)
        .filter_map(|response| response.hard_flag)
        .collect()
}

/// Best-effort recovery of a numeric score from free-text reasoning.
///
/// The intended format is underspecified upstream; the first decimal
/// number found is taken, defaulting to 0.0. Strictly a degraded
/// fallback, not a guarantee.
fn extract_score(reasoning: &str) -> f64 {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    let number = NUMBER.get_or_init(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid literal regex"));
    number
        .find(reasoning)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0)
}
