//! Wire-level model for the judgment event stream.
//!
//! These shapes mirror the stream protocol exactly; field availability
//! varies across protocol revisions, so everything optional is `Option`
//! with serde defaults. Sanitization into trusted types happens in
//! [`super::validate`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Maximum proposition length accepted for submission.
pub const MAX_ISSUE_LEN: usize = 2000;

/// Proposition rejected before a session is opened.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IssueError {
    #[error("proposition is empty after trimming")]
    Empty,
    #[error("proposition too long: {len} characters")]
    TooLong { len: usize },
}

/// Normalize a raw proposition: strip control characters, trim, and
/// enforce the non-empty and length contracts.
pub fn sanitize_issue(raw: &str) -> Result<String, IssueError> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        return Err(IssueError::Empty);
    }
    if trimmed.chars().count() > MAX_ISSUE_LEN {
        return Err(IssueError::TooLong {
            len: trimmed.chars().count(),
        });
    }
    Ok(trimmed.to_string())
}

/// The submission that opens a judgment session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgmentRequest {
    /// The proposition under judgment, non-empty after trimming.
    pub issue: String,
    /// Persona identity per slot, in fixed slot order.
    pub persona_ids: [String; 3],
}

impl JudgmentRequest {
    /// Build a request from a raw proposition, validating it first.
    pub fn new(raw_issue: &str, persona_ids: [String; 3]) -> Result<Self, IssueError> {
        Ok(Self {
            issue: sanitize_issue(raw_issue)?,
            persona_ids,
        })
    }
}

/// Unvalidated four-aspect scores as delivered by a worker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawScores {
    #[serde(default)]
    pub validity: Option<f64>,
    #[serde(default)]
    pub feasibility: Option<f64>,
    #[serde(default)]
    pub risk: Option<f64>,
    #[serde(default)]
    pub certainty: Option<f64>,
}

/// Unvalidated worker response payload.
///
/// `concerns` is kept as a raw JSON value: some workers emit a string or
/// omit the field entirely, and sanitization coerces it to a list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawResponse {
    #[serde(default)]
    pub scores: Option<RawScores>,
    #[serde(default)]
    pub decision: Option<String>,
    #[serde(default)]
    pub severity: Option<f64>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub concerns: Option<serde_json::Value>,
    #[serde(default)]
    pub hard_flag: Option<String>,
    #[serde(default)]
    pub average_score: Option<f64>,
}

/// One worker's completion report, success or failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerReport {
    /// Worker label, present on reports embedded in `final_result`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai: Option<String>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<RawResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_seconds: Option<f64>,
}

/// Backend-supplied aggregate fields carried by `final_result`.
///
/// Only `result` and `reasoning` are guaranteed; older sessions lack the
/// rest, and the classifier falls back per its precedence tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendAggregate {
    /// Decision token (mapped to a canonical label by the classifier).
    pub result: String,
    /// Free-text reasoning for the decision.
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judgment_severity: Option<f64>,
}

/// Events consumed from the per-session delivery channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JudgeEvent {
    /// One worker finished (success or failure).
    AiComplete { ai: String, result: WorkerReport },

    /// All workers finished; carries the backend aggregate.
    FinalResult {
        result: String,
        reasoning: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        severity_level: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        total_score: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        judgment_severity: Option<f64>,
        #[serde(default)]
        responses: Vec<WorkerReport>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        persona_names: Option<HashMap<String, String>>,
    },

    /// Transport-level failure; fatal to the session.
    Error { error: String },
}

impl JudgeEvent {
    /// The event type as it appears on the wire.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::AiComplete { .. } => "ai_complete",
            Self::FinalResult { .. } => "final_result",
            Self::Error { .. } => "error",
        }
    }

    /// The worker label, if this event is worker-scoped.
    pub fn worker_label(&self) -> Option<&str> {
        match self {
            Self::AiComplete { ai, .. } => Some(ai),
            _ => None,
        }
    }

    /// Extract the backend aggregate from a `final_result` event.
    pub fn aggregate(&self) -> Option<BackendAggregate> {
        match self {
            Self::FinalResult {
                result,
                reasoning,
                severity_level,
                total_score,
                judgment_severity,
                ..
            } => Some(BackendAggregate {
                result: result.clone(),
                reasoning: reasoning.clone(),
                severity_level: severity_level.clone(),
                total_score: *total_score,
                judgment_severity: *judgment_severity,
            }),
            _ => None,
        }
    }
}
