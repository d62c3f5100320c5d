//! Event model for the judgment stream.
//!
//! `wire` mirrors the stream protocol shapes verbatim; `validate`
//! sanitizes worker payloads into the trusted types the session and
//! classifier operate on.

pub mod validate;
pub mod wire;

pub use validate::{
    resolve_report, sanitize_response, AspectScores, ValidationError, WorkerResponse, WorkerResult,
};
pub use wire::{
    sanitize_issue, BackendAggregate, IssueError, JudgeEvent, JudgmentRequest, RawResponse,
    RawScores, WorkerReport, MAX_ISSUE_LEN,
};
