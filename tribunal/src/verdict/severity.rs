//! Severity model — tier classification and score resolution.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::events::WorkerResult;

/// Scores at or above this are HIGH severity.
pub const HIGH_SEVERITY_CUTOFF: f64 = 80.0;

/// Scores at or above this (and below the HIGH cutoff) are MID severity.
pub const MID_SEVERITY_CUTOFF: f64 = 50.0;

/// Coarse classification of the aggregate severity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SeverityTier {
    Low,
    Mid,
    High,
}

/// Decision score thresholds for one severity tier.
///
/// A HIGH-severity proposition needs a unanimous-level score to pass;
/// a LOW-severity one passes on a simple majority.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecisionThresholds {
    /// Minimum weighted total for outright approval.
    pub approve: f64,
    /// Minimum weighted total for conditional approval.
    pub conditional: f64,
}

impl SeverityTier {
    /// Classify a severity score (0–100) into a tier.
    pub fn from_score(score: f64) -> Self {
        if score >= HIGH_SEVERITY_CUTOFF {
            Self::High
        } else if score >= MID_SEVERITY_CUTOFF {
            Self::Mid
        } else {
            Self::Low
        }
    }

    /// The decision threshold row for this tier.
    pub fn decision_thresholds(self) -> DecisionThresholds {
        match self {
            Self::High => DecisionThresholds {
                approve: 3.0,
                conditional: 2.0,
            },
            Self::Mid => DecisionThresholds {
                approve: 2.0,
                conditional: 1.5,
            },
            Self::Low => DecisionThresholds {
                approve: 1.5,
                conditional: 1.0,
            },
        }
    }
}

impl std::fmt::Display for SeverityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Mid => write!(f, "MID"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

/// Resolve the aggregate severity score with explicit precedence:
///
/// 1. backend-supplied weighted aggregate, clamped to 0–100
/// 2. arithmetic mean of severities over successful results only
/// 3. 0.0 when no successful results exist
pub fn resolve_severity(results: &[WorkerResult; 3], backend: Option<f64>) -> f64 {
    if let Some(score) = backend {
        let clamped = score.clamp(0.0, 100.0);
        debug!(score = clamped, "severity from backend aggregate");
        return clamped;
    }

    let severities: Vec<f64> = results
        .iter()
        .filter_map(WorkerResult::response)
        .map(|r| r.severity)
        .collect();

    if severities.is_empty() {
        debug!("no successful results, severity defaults to 0.0");
        return 0.0;
    }

    let mean = severities.iter().sum::<f64>() / severities.len() as f64;
    debug!(score = mean, samples = severities.len(), "severity from client mean");
    mean
}
