//! Verdict Classification — Three Slots, One Outcome
//!
//! Pure classification of three resolved worker results (plus whatever
//! aggregate fields the backend supplied) into a single deterministic
//! verdict: decision label, severity tier and score, weighted total
//! score, and the aggregated hard flags.
//!
//! # Precedence
//!
//! ```text
//! decision        backend token ─────────> weighted client policy
//! severity score  backend aggregate ─────> mean over successes ──> 0.0
//! total score     backend value ─────────> number in reasoning ──> 0.0
//! severity tier   thresholds on the resolved score (HIGH ≥ 80, MID ≥ 50)
//! ```
//!
//! Backend-supplied values always win; client recomputation is strictly
//! a degraded fallback.

pub mod classify;
pub mod decision;
pub mod severity;

pub use classify::{classify, Verdict};
pub use decision::{Decision, HardFlag};
pub use severity::{
    resolve_severity, DecisionThresholds, SeverityTier, HIGH_SEVERITY_CUTOFF, MID_SEVERITY_CUTOFF,
};
