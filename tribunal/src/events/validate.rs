//! Worker response sanitization — wire payloads into trusted results.
//!
//! Upstream field availability is inconsistent across protocol revisions,
//! so every report passes through here before it can resolve a slot.
//! Out-of-range numbers are clamped, invalid enums normalized, and a
//! payload missing a required field downgrades the report to a failure
//! rather than poisoning the session.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::wire::{RawResponse, WorkerReport};
use crate::verdict::{Decision, HardFlag};

/// Four-aspect evaluation scores, each clamped to `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AspectScores {
    /// Alignment of the proposal with its objectives.
    pub validity: f64,
    /// Resource and condition availability.
    pub feasibility: f64,
    /// Safety/ethics/cost risk (1.0 = minimal risk).
    pub risk: f64,
    /// Evidence and assumption clarity.
    pub certainty: f64,
}

impl AspectScores {
    /// Mean of the four aspects.
    pub fn mean(&self) -> f64 {
        (self.validity + self.feasibility + self.risk + self.certainty) / 4.0
    }
}

/// A sanitized, trusted worker response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerResponse {
    pub scores: AspectScores,
    /// Mean aspect score; recomputed when the worker omits it.
    pub average_score: f64,
    pub decision: Decision,
    /// Severity estimate, clamped to `[0.0, 100.0]`.
    pub severity: f64,
    pub reason: String,
    pub concerns: Vec<String>,
    /// `None` means the worker raised no hard flag.
    pub hard_flag: Option<HardFlag>,
}

/// Outcome of one slot: a sanitized response or a failure record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WorkerResult {
    Success(WorkerResponse),
    Failure {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        raw_output: Option<String>,
    },
}

impl WorkerResult {
    /// Whether this slot resolved successfully.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The sanitized response, if successful.
    pub fn response(&self) -> Option<&WorkerResponse> {
        match self {
            Self::Success(response) => Some(response),
            Self::Failure { .. } => None,
        }
    }

    /// The failure message, if failed.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Failure { error, .. } => Some(error),
        }
    }
}

/// A required field was missing or unusable in a worker payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("missing required score: {0}")]
    MissingScore(&'static str),
}

/// Resolve a wire report into a slot result.
///
/// A successful report with an invalid payload becomes a `Failure` carrying
/// the validation message and the raw output for diagnosis.
pub fn resolve_report(report: WorkerReport) -> WorkerResult {
    if !report.success {
        return WorkerResult::Failure {
            error: report
                .error
                .unwrap_or_else(|| "worker failed without detail".to_string()),
            raw_output: report.raw_output,
        };
    }

    let Some(raw) = report.response else {
        return WorkerResult::Failure {
            error: report
                .error
                .unwrap_or_else(|| "missing response payload".to_string()),
            raw_output: report.raw_output,
        };
    };

    match sanitize_response(raw) {
        Ok(response) => WorkerResult::Success(response),
        Err(err) => {
            warn!(ai = report.ai.as_deref(), %err, "worker response failed validation");
            WorkerResult::Failure {
                error: format!("validation error: {err}"),
                raw_output: report.raw_output,
            }
        }
    }
}

/// Sanitize a raw response payload.
///
/// Rules:
/// - the four aspect scores are required and clamped to `[0.0, 1.0]`
/// - `decision` is required; unknown worker tokens normalize to `rejected`
/// - `severity` is required and clamped to `[0.0, 100.0]`
/// - `reason` is required
/// - `concerns` coerces to a string list (anything else becomes empty)
/// - `hard_flag` normalizes unknown tokens to no flag
/// - `average_score` is recomputed from the scores when absent
pub fn sanitize_response(raw: RawResponse) -> Result<WorkerResponse, ValidationError> {
    let raw_scores = raw.scores.ok_or(ValidationError::MissingField("scores"))?;
    let scores = AspectScores {
        validity: clamp_unit(raw_scores.validity.ok_or(ValidationError::MissingScore("validity"))?),
        feasibility: clamp_unit(
            raw_scores
                .feasibility
                .ok_or(ValidationError::MissingScore("feasibility"))?,
        ),
        risk: clamp_unit(raw_scores.risk.ok_or(ValidationError::MissingScore("risk"))?),
        certainty: clamp_unit(
            raw_scores
                .certainty
                .ok_or(ValidationError::MissingScore("certainty"))?,
        ),
    };

    let token = raw.decision.ok_or(ValidationError::MissingField("decision"))?;
    let decision = match Decision::from_token(&token) {
        known if known.is_known() => known,
        unknown => {
            warn!(token = %unknown, "unknown worker decision token, normalizing to rejected");
            Decision::Rejected
        }
    };

    let severity = raw
        .severity
        .ok_or(ValidationError::MissingField("severity"))?
        .clamp(0.0, 100.0);

    let reason = raw.reason.ok_or(ValidationError::MissingField("reason"))?;

    let concerns = match raw.concerns {
        Some(serde_json::Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        _ => Vec::new(),
    };

    let hard_flag = raw.hard_flag.as_deref().and_then(HardFlag::parse);

    let average_score = raw
        .average_score
        .map(clamp_unit)
        .unwrap_or_else(|| scores.mean());

    Ok(WorkerResponse {
        scores,
        average_score,
        decision,
        severity,
        reason,
        concerns,
        hard_flag,
    })
}

fn clamp_unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}
