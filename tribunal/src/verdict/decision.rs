//! Decision tokens, hard flags, and the degraded decision policy.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::severity::SeverityTier;
use crate::events::WorkerResult;

/// Canonical decision over the five known wire tokens.
///
/// Mapping is total: unknown tokens pass through uppercased via `Other`
/// instead of failing, so a protocol revision that introduces a new token
/// degrades to a readable label rather than an error.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    /// Proposition approved outright.
    Approved,
    /// Approved with conditions attached.
    Conditional,
    /// Partially approved by an individual worker.
    Partial,
    /// Rejected.
    Rejected,
    /// The proposition is not a decision at all.
    NotApplicable,
    /// Unrecognized token, passed through uppercased.
    #[serde(untagged)]
    Other(String),
}

impl Decision {
    /// The known wire tokens, in canonical order.
    pub const KNOWN_TOKENS: [&'static str; 5] = [
        "approved",
        "conditional",
        "partial",
        "rejected",
        "not_applicable",
    ];

    /// Map a wire token to its canonical decision, case-insensitively.
    pub fn from_token(token: &str) -> Self {
        match token.trim().to_lowercase().as_str() {
            "approved" => Self::Approved,
            "conditional" => Self::Conditional,
            "partial" => Self::Partial,
            "rejected" => Self::Rejected,
            "not_applicable" => Self::NotApplicable,
            _ => Self::Other(token.trim().to_uppercase()),
        }
    }

    /// Display label for the verdict surface.
    pub fn label(&self) -> &str {
        match self {
            Self::Approved => "APPROVED",
            Self::Conditional => "CONDITIONAL",
            Self::Partial => "PARTIAL",
            Self::Rejected => "REJECTED",
            Self::NotApplicable => "NOT_APPLICABLE",
            Self::Other(token) => token,
        }
    }

    /// Whether this is one of the five known decisions.
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    /// Weight a single worker's decision contributes to the total score.
    pub fn weight(&self) -> f64 {
        match self {
            Self::Approved => 1.0,
            Self::Partial => 0.5,
            _ => 0.0,
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Categorical compliance warning raised by a worker.
///
/// The wire marker for "no flag" is the token `none`; it is represented
/// here as the absence of a flag, and unrecognized tokens normalize to
/// that absence rather than failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HardFlag {
    Compliance,
    Security,
    Privacy,
}

impl HardFlag {
    /// Parse a wire token; `none` and unrecognized tokens yield `None`.
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_lowercase().as_str() {
            "compliance" => Some(Self::Compliance),
            "security" => Some(Self::Security),
            "privacy" => Some(Self::Privacy),
            _ => None,
        }
    }
}

impl std::fmt::Display for HardFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Compliance => write!(f, "compliance"),
            Self::Security => write!(f, "security"),
            Self::Privacy => write!(f, "privacy"),
        }
    }
}

/// Minimum count of `not_applicable` answers that overrides the scoring path.
const NOT_APPLICABLE_QUORUM: usize = 2;

/// Recompute the decision client-side when no backend aggregate is available.
///
/// Precedence:
/// 1. `not_applicable` quorum among successful workers
/// 2. any aggregated hard flag forces rejection
/// 3. weighted sum of worker decisions against the tier threshold row
///
/// Returns the decision, the weighted total score, and a synthesized
/// reasoning line.
pub(crate) fn degraded_decision(
    results: &[WorkerResult; 3],
    tier: SeverityTier,
    hard_flags: &[HardFlag],
) -> (Decision, f64, String) {
    let responses: Vec<_> = results.iter().filter_map(WorkerResult::response).collect();

    let not_applicable = responses
        .iter()
        .filter(|r| r.decision == Decision::NotApplicable)
        .count();
    if not_applicable >= NOT_APPLICABLE_QUORUM {
        info!(not_applicable, "not-applicable quorum reached");
        return (
            Decision::NotApplicable,
            0.0,
            "majority of workers judged the proposition non-decisional".to_string(),
        );
    }

    if !hard_flags.is_empty() {
        let listed: Vec<String> = hard_flags.iter().map(ToString::to_string).collect();
        return (
            Decision::Rejected,
            0.0,
            format!("hard flag(s) detected: {} force rejection", listed.join(", ")),
        );
    }

    let total: f64 = responses.iter().map(|r| r.decision.weight()).sum();
    let thresholds = tier.decision_thresholds();
    info!(total, tier = %tier, "weighted decision score");

    if total >= thresholds.approve {
        let reasoning = format!(
            "total score {:.1}/{:.1} ({} severity)",
            total, thresholds.approve, tier
        );
        (Decision::Approved, total, reasoning)
    } else if total >= thresholds.conditional {
        let reasoning = format!(
            "total score {:.1}/{:.1} ({} severity)",
            total, thresholds.approve, tier
        );
        (Decision::Conditional, total, reasoning)
    } else {
        let reasoning = format!(
            "total score {:.1} below {:.1} ({} severity)",
            total, thresholds.conditional, tier
        );
        (Decision::Rejected, total, reasoning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{AspectScores, WorkerResponse};

    fn success(decision: Decision, severity: f64, hard_flag: Option<HardFlag>) -> WorkerResult {
        WorkerResult::Success(WorkerResponse {
            scores: AspectScores {
                validity: 0.8,
                feasibility: 0.8,
                risk: 0.8,
                certainty: 0.8,
            },
            average_score: 0.8,
            decision,
            severity,
            reason: "test".to_string(),
            concerns: vec![],
            hard_flag,
        })
    }

    fn failure() -> WorkerResult {
        WorkerResult::Failure {
            error: "timeout".to_string(),
            raw_output: None,
        }
    }

    #[test]
    fn test_known_token_mapping() {
        assert_eq!(Decision::from_token("approved"), Decision::Approved);
        assert_eq!(Decision::from_token("conditional"), Decision::Conditional);
        assert_eq!(Decision::from_token("partial"), Decision::Partial);
        assert_eq!(Decision::from_token("rejected"), Decision::Rejected);
        assert_eq!(
            Decision::from_token("not_applicable"),
            Decision::NotApplicable
        );
    }

    #[test]
    fn test_token_mapping_case_insensitive() {
        assert_eq!(Decision::from_token("APPROVED"), Decision::Approved);
        assert_eq!(Decision::from_token("  Rejected "), Decision::Rejected);
    }

    #[test]
    fn test_unknown_token_passthrough_uppercased() {
        let decision = Decision::from_token("vetoed");
        assert_eq!(decision, Decision::Other("VETOED".to_string()));
        assert_eq!(decision.label(), "VETOED");
        assert!(!decision.is_known());
    }

    #[test]
    fn test_all_known_tokens_are_known() {
        for token in Decision::KNOWN_TOKENS {
            assert!(Decision::from_token(token).is_known(), "token {}", token);
        }
    }

    #[test]
    fn test_decision_labels() {
        assert_eq!(Decision::Approved.to_string(), "APPROVED");
        assert_eq!(Decision::Conditional.to_string(), "CONDITIONAL");
        assert_eq!(Decision::Partial.to_string(), "PARTIAL");
        assert_eq!(Decision::Rejected.to_string(), "REJECTED");
        assert_eq!(Decision::NotApplicable.to_string(), "NOT_APPLICABLE");
    }

    #[test]
    fn test_decision_serde() {
        let json = serde_json::to_string(&Decision::NotApplicable).unwrap();
        assert_eq!(json, "\"NOT_APPLICABLE\"");
        let other = Decision::Other("VETOED".to_string());
        assert_eq!(serde_json::to_string(&other).unwrap(), "\"VETOED\"");
    }

    #[test]
    fn test_decision_weights() {
        assert_eq!(Decision::Approved.weight(), 1.0);
        assert_eq!(Decision::Partial.weight(), 0.5);
        assert_eq!(Decision::Rejected.weight(), 0.0);
        assert_eq!(Decision::NotApplicable.weight(), 0.0);
        assert_eq!(Decision::Other("VETOED".into()).weight(), 0.0);
    }

    #[test]
    fn test_hard_flag_parse() {
        assert_eq!(HardFlag::parse("security"), Some(HardFlag::Security));
        assert_eq!(HardFlag::parse("Compliance"), Some(HardFlag::Compliance));
        assert_eq!(HardFlag::parse("privacy"), Some(HardFlag::Privacy));
        assert_eq!(HardFlag::parse("none"), None);
        assert_eq!(HardFlag::parse("unknown"), None);
    }

    #[test]
    fn test_degraded_unanimous_approval_low_tier() {
        let results = [
            success(Decision::Approved, 20.0, None),
            success(Decision::Approved, 30.0, None),
            success(Decision::Approved, 10.0, None),
        ];
        let (decision, total, _) = degraded_decision(&results, SeverityTier::Low, &[]);
        assert_eq!(decision, Decision::Approved);
        assert_eq!(total, 3.0);
    }

    #[test]
    fn test_degraded_high_tier_requires_unanimity() {
        // 2.5 points clears the MID approve row but only the HIGH conditional row.
        let results = [
            success(Decision::Approved, 90.0, None),
            success(Decision::Approved, 85.0, None),
            success(Decision::Partial, 95.0, None),
        ];
        let (decision, total, reasoning) = degraded_decision(&results, SeverityTier::High, &[]);
        assert_eq!(decision, Decision::Conditional);
        assert_eq!(total, 2.5);
        assert!(reasoning.contains("HIGH"));

        let (decision, _, _) = degraded_decision(&results, SeverityTier::Mid, &[]);
        assert_eq!(decision, Decision::Approved);
    }

    #[test]
    fn test_degraded_rejection_below_conditional_row() {
        let results = [
            success(Decision::Rejected, 60.0, None),
            success(Decision::Partial, 60.0, None),
            failure(),
        ];
        let (decision, total, reasoning) = degraded_decision(&results, SeverityTier::Mid, &[]);
        assert_eq!(decision, Decision::Rejected);
        assert_eq!(total, 0.5);
        assert!(reasoning.contains("below"));
    }

    #[test]
    fn test_degraded_hard_flag_forces_rejection() {
        let results = [
            success(Decision::Approved, 20.0, Some(HardFlag::Security)),
            success(Decision::Approved, 20.0, None),
            success(Decision::Approved, 20.0, None),
        ];
        let (decision, total, reasoning) =
            degraded_decision(&results, SeverityTier::Low, &[HardFlag::Security]);
        assert_eq!(decision, Decision::Rejected);
        assert_eq!(total, 0.0);
        assert!(reasoning.contains("security"));
    }

    #[test]
    fn test_degraded_not_applicable_quorum() {
        let results = [
            success(Decision::NotApplicable, 0.0, None),
            success(Decision::NotApplicable, 0.0, None),
            success(Decision::Approved, 10.0, None),
        ];
        let (decision, total, _) = degraded_decision(&results, SeverityTier::Low, &[]);
        assert_eq!(decision, Decision::NotApplicable);
        assert_eq!(total, 0.0);
    }

    #[test]
    fn test_degraded_single_not_applicable_is_scored() {
        let results = [
            success(Decision::NotApplicable, 0.0, None),
            success(Decision::Approved, 10.0, None),
            success(Decision::Approved, 10.0, None),
        ];
        let (decision, total, _) = degraded_decision(&results, SeverityTier::Low, &[]);
        assert_eq!(decision, Decision::Approved);
        assert_eq!(total, 2.0);
    }
}
