//! The event reducer — a pure transition function over session state.
//!
//! `SessionState::apply` is the only mutation path while a session is
//! live. It maps (current state, typed event) to an [`Effect`] the
//! controller acts on, or rejects the event as a [`ProtocolViolation`]
//! leaving the state untouched. Duplicate worker completions are the one
//! silent case: an explicit idempotent no-op, not an error.

use tracing::{debug, warn};

use super::slots::SlotId;
use super::state::{SessionPhase, SessionState};
use crate::events::WorkerResult;
use crate::verdict::Verdict;

/// Typed events consumed by the reducer.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// One slot resolved (success or failure).
    WorkerCompleted { slot: SlotId, result: WorkerResult },
    /// The classified verdict, valid only once all slots resolved.
    Finalized { verdict: Verdict },
    /// Transport failure; fatal.
    StreamFailed { cause: String },
}

impl SessionEvent {
    /// Short name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::WorkerCompleted { .. } => "worker_completed",
            Self::Finalized { .. } => "finalized",
            Self::StreamFailed { .. } => "stream_failed",
        }
    }
}

/// What an accepted event did to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// A new result was stored and the count advanced.
    Recorded { slot: SlotId, completed: u8 },
    /// The slot was already resolved; nothing changed.
    Duplicate { slot: SlotId },
    /// The verdict was stored; session is `Done`.
    Done,
    /// The session is `Errored`; partial results were discarded.
    Errored { cause: String },
}

/// An event that cannot be accepted in the current state.
///
/// Violations are rejected — the event never mutates state and is never
/// coerced into a valid transition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolViolation {
    #[error("finalization before all workers resolved: {completed}/3")]
    PrematureFinalize { completed: u8 },
    #[error("event for unrecognized worker label: {label:?}")]
    UnknownWorker { label: String },
    #[error("{event} not valid in phase {phase}")]
    InvalidPhase {
        event: &'static str,
        phase: SessionPhase,
    },
}

impl SessionState {
    /// Apply one event, returning its effect or rejecting it.
    pub fn apply(&mut self, event: SessionEvent) -> Result<Effect, ProtocolViolation> {
        let name = event.name();
        match event {
            SessionEvent::WorkerCompleted { slot, result } => {
                if !self.phase().accepts_results() {
                    return Err(ProtocolViolation::InvalidPhase {
                        event: name,
                        phase: self.phase(),
                    });
                }

                if !self.store_result(slot, result) {
                    debug!(%slot, "duplicate completion suppressed");
                    return Ok(Effect::Duplicate { slot });
                }

                let completed = self.completed();
                debug!(%slot, completed, "worker resolved");

                if completed == 3 {
                    // Guarded above: phase is Running here, and
                    // Running -> Finalizing is always valid.
                    let _ = self.transition(SessionPhase::Finalizing, "all workers resolved");
                }
                Ok(Effect::Recorded { slot, completed })
            }

            SessionEvent::Finalized { verdict } => match self.phase() {
                SessionPhase::Finalizing => {
                    self.store_verdict(verdict);
                    let _ = self.transition(SessionPhase::Done, "verdict classified");
                    Ok(Effect::Done)
                }
                SessionPhase::Idle | SessionPhase::Running => {
                    warn!(completed = self.completed(), "premature finalization rejected");
                    Err(ProtocolViolation::PrematureFinalize {
                        completed: self.completed(),
                    })
                }
                phase => Err(ProtocolViolation::InvalidPhase { event: name, phase }),
            },

            SessionEvent::StreamFailed { cause } => {
                if self.phase().is_terminal() || self.phase() == SessionPhase::Idle {
                    return Err(ProtocolViolation::InvalidPhase {
                        event: name,
                        phase: self.phase(),
                    });
                }
                warn!(%cause, "stream failed, discarding partial results");
                self.discard_results();
                let _ = self.transition(SessionPhase::Errored, &cause);
                Ok(Effect::Errored { cause })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NodeConfig;
    use crate::events::{AspectScores, WorkerResponse};
    use crate::verdict::{classify, Decision, SeverityTier};

    fn running_state() -> SessionState {
        let mut state = SessionState::new("s-001", "ship it?", NodeConfig::default_trio());
        state.start().unwrap();
        state
    }

    fn success(severity: f64) -> WorkerResult {
        WorkerResult::Success(WorkerResponse {
            scores: AspectScores {
                validity: 0.8,
                feasibility: 0.8,
                risk: 0.8,
                certainty: 0.8,
            },
            average_score: 0.8,
            decision: Decision::Approved,
            severity,
            reason: "fine".to_string(),
            concerns: vec![],
            hard_flag: None,
        })
    }

    fn verdict_for(state: &SessionState) -> Verdict {
        classify(&state.completed_results().unwrap(), None)
    }

    fn complete_all(state: &mut SessionState) {
        for slot in SlotId::all() {
            state
                .apply(SessionEvent::WorkerCompleted {
                    slot,
                    result: success(60.0),
                })
                .unwrap();
        }
    }

    #[test]
    fn test_recording_advances_count() {
        let mut state = running_state();
        let effect = state
            .apply(SessionEvent::WorkerCompleted {
                slot: SlotId::Two,
                result: success(50.0),
            })
            .unwrap();
        assert_eq!(
            effect,
            Effect::Recorded {
                slot: SlotId::Two,
                completed: 1
            }
        );
        assert_eq!(state.phase(), SessionPhase::Running);
    }

    #[test]
    fn test_third_completion_enters_finalizing() {
        let mut state = running_state();
        complete_all(&mut state);
        assert_eq!(state.phase(), SessionPhase::Finalizing);
        assert_eq!(state.completed(), 3);
    }

    #[test]
    fn test_duplicate_is_noop() {
        let mut state = running_state();
        state
            .apply(SessionEvent::WorkerCompleted {
                slot: SlotId::One,
                result: success(50.0),
            })
            .unwrap();

        let effect = state
            .apply(SessionEvent::WorkerCompleted {
                slot: SlotId::One,
                result: success(99.0),
            })
            .unwrap();

        assert_eq!(effect, Effect::Duplicate { slot: SlotId::One });
        assert_eq!(state.completed(), 1);
        // The original result is kept.
        let kept = state.result(SlotId::One).unwrap().response().unwrap();
        assert_eq!(kept.severity, 50.0);
    }

    #[test]
    fn test_premature_finalize_rejected() {
        let mut state = running_state();
        state
            .apply(SessionEvent::WorkerCompleted {
                slot: SlotId::One,
                result: success(50.0),
            })
            .unwrap();

        let placeholder = classify(
            &[success(50.0), success(50.0), success(50.0)],
            None,
        );
        let violation = state
            .apply(SessionEvent::Finalized {
                verdict: placeholder,
            })
            .unwrap_err();

        assert_eq!(violation, ProtocolViolation::PrematureFinalize { completed: 1 });
        // Rejected, not coerced: still running, no verdict.
        assert_eq!(state.phase(), SessionPhase::Running);
        assert!(state.verdict().is_none());
    }

    #[test]
    fn test_finalize_stores_verdict() {
        let mut state = running_state();
        complete_all(&mut state);

        let verdict = verdict_for(&state);
        let effect = state
            .apply(SessionEvent::Finalized {
                verdict: verdict.clone(),
            })
            .unwrap();

        assert_eq!(effect, Effect::Done);
        assert_eq!(state.phase(), SessionPhase::Done);
        assert_eq!(state.verdict(), Some(&verdict));
        assert_eq!(verdict.severity_tier, SeverityTier::Mid);
    }

    #[test]
    fn test_stream_failure_discards_partials() {
        let mut state = running_state();
        state
            .apply(SessionEvent::WorkerCompleted {
                slot: SlotId::One,
                result: success(50.0),
            })
            .unwrap();

        let effect = state
            .apply(SessionEvent::StreamFailed {
                cause: "connection reset".to_string(),
            })
            .unwrap();

        assert_eq!(
            effect,
            Effect::Errored {
                cause: "connection reset".to_string()
            }
        );
        assert_eq!(state.phase(), SessionPhase::Errored);
        assert_eq!(state.completed(), 0);
        assert!(state.result(SlotId::One).is_none());
        assert!(state.verdict().is_none());
    }

    #[test]
    fn test_stream_failure_in_finalizing() {
        let mut state = running_state();
        complete_all(&mut state);
        state
            .apply(SessionEvent::StreamFailed {
                cause: "closed before final result".to_string(),
            })
            .unwrap();
        assert_eq!(state.phase(), SessionPhase::Errored);
        assert!(state.verdict().is_none());
    }

    #[test]
    fn test_events_rejected_in_terminal_phase() {
        let mut state = running_state();
        complete_all(&mut state);
        let verdict = verdict_for(&state);
        state.apply(SessionEvent::Finalized { verdict }).unwrap();

        let violation = state
            .apply(SessionEvent::WorkerCompleted {
                slot: SlotId::One,
                result: success(10.0),
            })
            .unwrap_err();
        assert!(matches!(
            violation,
            ProtocolViolation::InvalidPhase {
                phase: SessionPhase::Done,
                ..
            }
        ));

        let violation = state
            .apply(SessionEvent::StreamFailed {
                cause: "late".to_string(),
            })
            .unwrap_err();
        assert!(matches!(violation, ProtocolViolation::InvalidPhase { .. }));
    }

    #[test]
    fn test_completion_order_does_not_change_stored_state() {
        let orders: [[SlotId; 3]; 6] = [
            [SlotId::One, SlotId::Two, SlotId::Three],
            [SlotId::One, SlotId::Three, SlotId::Two],
            [SlotId::Two, SlotId::One, SlotId::Three],
            [SlotId::Two, SlotId::Three, SlotId::One],
            [SlotId::Three, SlotId::One, SlotId::Two],
            [SlotId::Three, SlotId::Two, SlotId::One],
        ];

        let mut verdicts = Vec::new();
        for order in orders {
            let mut state = running_state();
            for (i, slot) in order.into_iter().enumerate() {
                state
                    .apply(SessionEvent::WorkerCompleted {
                        slot,
                        // Severity keyed to the slot, not arrival position.
                        result: success(80.0 + slot.ordinal() as f64 * 5.0),
                    })
                    .unwrap();
                assert_eq!(state.completed() as usize, i + 1);
            }
            let verdict = verdict_for(&state);
            state
                .apply(SessionEvent::Finalized {
                    verdict: verdict.clone(),
                })
                .unwrap();
            verdicts.push(verdict);
        }

        for verdict in &verdicts[1..] {
            assert_eq!(verdict, &verdicts[0]);
        }
    }

    #[test]
    fn test_violation_display() {
        let violation = ProtocolViolation::PrematureFinalize { completed: 2 };
        assert!(violation.to_string().contains("2/3"));

        let violation = ProtocolViolation::UnknownWorker {
            label: "mystery".to_string(),
        };
        assert!(violation.to_string().contains("mystery"));
    }
}
