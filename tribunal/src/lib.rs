//! Tribunal — deterministic aggregation core for a three-node judgment
//! workflow.
//!
//! One proposition goes out to three independently-executing evaluation
//! workers; their completion events come back in arbitrary order, with
//! duplicates and partial failures, over a stream whose field
//! availability drifts across protocol revisions. This crate reduces
//! that stream into exactly one verdict per session.
//!
//! - [`session`] — the session controller, the pure event reducer, and
//!   the fixed three-slot model
//! - [`verdict`] — pure classification of resolved results into a
//!   decision label, severity tier/score, and aggregated hard flags
//! - [`events`] — wire shapes for the stream plus response sanitization
//! - [`config`] — worker configuration reconciliation (local cache vs.
//!   authoritative remote)
//! - [`transport`] — the per-session delivery channel, as a trait
//!
//! Transport implementations, rendering, and history persistence are
//! external collaborators; this crate only consumes the stream and
//! publishes typed notices.

pub mod config;
pub mod events;
pub mod session;
pub mod transport;
pub mod verdict;

// Re-export the session surface
pub use session::{
    Effect, ProtocolViolation, SessionController, SessionError, SessionEvent, SessionHandle,
    SessionNotice, SessionPhase, SessionState, SlotId,
};

// Re-export the classifier surface
pub use verdict::{classify, Decision, HardFlag, SeverityTier, Verdict};

// Re-export wire and validation types
pub use events::{
    resolve_report, sanitize_issue, BackendAggregate, JudgeEvent, JudgmentRequest, WorkerReport,
    WorkerResult,
};

// Re-export configuration types
pub use config::{ConfigReconciler, JsonFileStore, MemoryStore, NodeConfig, StaticRemote};

// Re-export the transport seam
pub use transport::{ChannelTransport, JudgmentTransport, TransportDriver, TransportError};
