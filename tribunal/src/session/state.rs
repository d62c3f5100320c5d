//! Session state — phases, transitions, and the per-slot result map.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::slots::{SlotId, SlotTable};
use crate::config::NodeConfig;
use crate::events::WorkerResult;
use crate::verdict::Verdict;

/// Phase of a judgment session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionPhase {
    /// Session created but the stream is not yet open.
    Idle,
    /// Collecting worker completions.
    Running,
    /// All three slots resolved; awaiting the final aggregate.
    Finalizing,
    /// Verdict stored — terminal success.
    Done,
    /// Stream failure — terminal, no verdict.
    Errored,
}

impl SessionPhase {
    /// Whether this is a terminal phase.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Errored)
    }

    /// Valid transitions from this phase.
    pub fn valid_transitions(self) -> &'static [SessionPhase] {
        match self {
            Self::Idle => &[Self::Running],
            Self::Running => &[Self::Finalizing, Self::Errored],
            Self::Finalizing => &[Self::Done, Self::Errored],
            Self::Done | Self::Errored => &[],
        }
    }

    /// Whether completion events are accepted in this phase.
    pub fn accepts_results(self) -> bool {
        matches!(self, Self::Running | Self::Finalizing)
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Finalizing => write!(f, "finalizing"),
            Self::Done => write!(f, "done"),
            Self::Errored => write!(f, "errored"),
        }
    }
}

/// A phase transition record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: SessionPhase,
    pub to: SessionPhase,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}

/// Error for invalid phase transitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid transition {from} -> {to}: {reason}")]
pub struct TransitionError {
    pub from: SessionPhase,
    pub to: SessionPhase,
    pub reason: String,
}

/// The state of one judgment session, exclusively owned by its controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    /// Unique session identifier.
    pub id: String,
    /// The proposition under judgment.
    pub proposition: String,
    /// Node identity bound to each slot, immutable for the session.
    pub nodes: [NodeConfig; 3],
    /// Worker-label lookup table.
    slots: SlotTable,
    /// Per-slot results; `None` until the slot resolves.
    results: [Option<WorkerResult>; 3],
    /// Count of resolved slots; equals the number of non-absent results
    /// and never decreases while the session is live.
    completed: u8,
    /// Current phase.
    phase: SessionPhase,
    /// The verdict, present only in `Done`.
    verdict: Option<Verdict>,
    /// Transition history.
    pub transitions: Vec<TransitionRecord>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
}

impl SessionState {
    /// Create a new idle session.
    pub fn new(id: &str, proposition: &str, nodes: [NodeConfig; 3]) -> Self {
        let slots = SlotTable::new(&nodes);
        Self {
            id: id.to_string(),
            proposition: proposition.to_string(),
            nodes,
            slots,
            results: [None, None, None],
            completed: 0,
            phase: SessionPhase::Idle,
            verdict: None,
            transitions: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Open the session (Idle -> Running).
    pub fn start(&mut self) -> Result<(), TransitionError> {
        self.transition(SessionPhase::Running, "session started")
    }

    /// Transition to a new phase with a reason.
    pub fn transition(&mut self, to: SessionPhase, reason: &str) -> Result<(), TransitionError> {
        if !self.phase.valid_transitions().contains(&to) {
            return Err(TransitionError {
                from: self.phase,
                to,
                reason: format!(
                    "not a valid transition (allowed: {:?})",
                    self.phase.valid_transitions()
                ),
            });
        }

        self.transitions.push(TransitionRecord {
            from: self.phase,
            to,
            timestamp: Utc::now(),
            reason: reason.to_string(),
        });
        self.phase = to;
        Ok(())
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Count of resolved slots, in `[0, 3]`.
    pub fn completed(&self) -> u8 {
        self.completed
    }

    /// Whether the session has ended.
    pub fn is_complete(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Resolve a worker label to its slot.
    pub fn resolve_label(&self, label: &str) -> Option<SlotId> {
        self.slots.resolve(label)
    }

    /// The stored result for a slot, if resolved.
    pub fn result(&self, slot: SlotId) -> Option<&WorkerResult> {
        self.results[slot.index()].as_ref()
    }

    /// All three results, available only once every slot has resolved.
    pub fn completed_results(&self) -> Option<[WorkerResult; 3]> {
        if self.completed < 3 {
            return None;
        }
        match &self.results {
            [Some(a), Some(b), Some(c)] => Some([a.clone(), b.clone(), c.clone()]),
            _ => None,
        }
    }

    /// The verdict, present only once the session is `Done`.
    pub fn verdict(&self) -> Option<&Verdict> {
        self.verdict.as_ref()
    }

    /// Compact status line.
    pub fn status_line(&self) -> String {
        format!(
            "[{}] {}/3 resolved | session={}",
            self.phase, self.completed, self.id
        )
    }

    // Reducer internals: state mutation happens only through `apply`
    // (session/reducer.rs), which upholds the phase and count invariants.

    pub(super) fn store_result(&mut self, slot: SlotId, result: WorkerResult) -> bool {
        if self.results[slot.index()].is_some() {
            return false;
        }
        self.results[slot.index()] = Some(result);
        self.completed += 1;
        true
    }

    pub(super) fn store_verdict(&mut self, verdict: Verdict) {
        self.verdict = Some(verdict);
    }

    pub(super) fn discard_results(&mut self) {
        self.results = [None, None, None];
        self.completed = 0;
        self.verdict = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> SessionState {
        SessionState::new("s-001", "ship the feature?", NodeConfig::default_trio())
    }

    fn failure() -> WorkerResult {
        WorkerResult::Failure {
            error: "timeout".to_string(),
            raw_output: None,
        }
    }

    #[test]
    fn test_new_session_idle() {
        let state = state();
        assert_eq!(state.phase(), SessionPhase::Idle);
        assert_eq!(state.completed(), 0);
        assert!(!state.is_complete());
        assert!(state.verdict().is_none());
    }

    #[test]
    fn test_start_session() {
        let mut state = state();
        state.start().unwrap();
        assert_eq!(state.phase(), SessionPhase::Running);
        assert_eq!(state.transitions.len(), 1);
        assert_eq!(state.transitions[0].from, SessionPhase::Idle);
    }

    #[test]
    fn test_invalid_transition_rejected() {
        let mut state = state();
        let err = state
            .transition(SessionPhase::Done, "skip ahead")
            .unwrap_err();
        assert_eq!(err.from, SessionPhase::Idle);
        assert_eq!(err.to, SessionPhase::Done);
        // State unchanged.
        assert_eq!(state.phase(), SessionPhase::Idle);
        assert!(state.transitions.is_empty());
    }

    #[test]
    fn test_terminal_phases_allow_nothing() {
        assert!(SessionPhase::Done.valid_transitions().is_empty());
        assert!(SessionPhase::Errored.valid_transitions().is_empty());
        assert!(SessionPhase::Done.is_terminal());
        assert!(SessionPhase::Errored.is_terminal());
        assert!(!SessionPhase::Finalizing.is_terminal());
    }

    #[test]
    fn test_completed_results_requires_all_slots() {
        let mut state = state();
        state.start().unwrap();
        assert!(state.completed_results().is_none());

        assert!(state.store_result(SlotId::One, failure()));
        assert!(state.store_result(SlotId::Two, failure()));
        assert!(state.completed_results().is_none());

        assert!(state.store_result(SlotId::Three, failure()));
        assert!(state.completed_results().is_some());
        assert_eq!(state.completed(), 3);
    }

    #[test]
    fn test_store_result_is_idempotent_per_slot() {
        let mut state = state();
        state.start().unwrap();
        assert!(state.store_result(SlotId::Two, failure()));
        assert!(!state.store_result(SlotId::Two, failure()));
        assert_eq!(state.completed(), 1);
    }

    #[test]
    fn test_label_resolution_through_state() {
        let state = state();
        assert_eq!(state.resolve_label("NODE 2"), Some(SlotId::Two));
        assert_eq!(state.resolve_label("nobody"), None);
    }

    #[test]
    fn test_status_line() {
        let mut state = state();
        state.start().unwrap();
        let line = state.status_line();
        assert!(line.contains("[running]"));
        assert!(line.contains("0/3"));
        assert!(line.contains("s-001"));
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(SessionPhase::Idle.to_string(), "idle");
        assert_eq!(SessionPhase::Running.to_string(), "running");
        assert_eq!(SessionPhase::Finalizing.to_string(), "finalizing");
        assert_eq!(SessionPhase::Done.to_string(), "done");
        assert_eq!(SessionPhase::Errored.to_string(), "errored");
    }
}
