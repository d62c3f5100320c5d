//! Session controller — owns the lifecycle of one judgment session.
//!
//! The controller validates the proposition, binds the three worker
//! slots, submits the judgment request, and drives the reducer from the
//! event stream in a spawned task. Observers subscribe to a broadcast
//! of [`SessionNotice`]s; `cancel()` tears the drive loop down and is
//! idempotent. At most one session per controller is live at a time.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::reducer::{Effect, ProtocolViolation, SessionEvent};
use super::slots::SlotId;
use super::state::SessionState;
use crate::config::NodeConfig;
use crate::events::{
    resolve_report, BackendAggregate, IssueError, JudgeEvent, JudgmentRequest, WorkerResult,
};
use crate::transport::JudgmentTransport;
use crate::verdict::{classify, Verdict};

/// Broadcast channel capacity for session notices.
const NOTICE_CAPACITY: usize = 64;

/// Error starting a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The proposition failed validation; nothing was mutated.
    #[error("invalid proposition: {0}")]
    InvalidInput(#[from] IssueError),
    /// A prior session from this controller is still open.
    #[error("a session is already in progress on this controller")]
    SessionInProgress,
}

/// Notifications published while a session runs.
#[derive(Debug, Clone)]
pub enum SessionNotice {
    /// A slot resolved; `completed` slots are now in.
    Progress { slot: SlotId, completed: u8 },
    /// The resolved result for a slot.
    WorkerComplete { slot: SlotId, result: WorkerResult },
    /// The final verdict; terminal.
    Verdict(Verdict),
    /// An error surfaced; `fatal` means the session ended without a verdict.
    Error { message: String, fatal: bool },
}

/// Controller for judgment sessions; at most one live session at a time.
///
/// The live session is tracked as an epoch (0 = idle) so that a stale
/// drive loop ending late can only release its own claim, never one
/// belonging to a newer session.
#[derive(Default)]
pub struct SessionController {
    active: Arc<AtomicU64>,
    epochs: AtomicU64,
}

/// Handle to a running session.
#[derive(Debug)]
pub struct SessionHandle {
    id: String,
    notices: broadcast::Sender<SessionNotice>,
    join: JoinHandle<()>,
    cancelled: AtomicBool,
    active: Arc<AtomicU64>,
    epoch: u64,
}

/// Releases the controller's claim when the drive loop ends, including
/// when the task is aborted by `cancel()`.
struct ActiveGuard {
    active: Arc<AtomicU64>,
    epoch: u64,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        let _ = self
            .active
            .compare_exchange(self.epoch, 0, Ordering::SeqCst, Ordering::SeqCst);
    }
}

impl SessionController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether this controller currently has a live session.
    pub fn has_active_session(&self) -> bool {
        self.active.load(Ordering::SeqCst) != 0
    }

    /// Start a judgment session.
    ///
    /// Validates the proposition, submits the request through the
    /// transport, and spawns the drive loop. Fails without mutating any
    /// state when the input is invalid or a session is still open.
    pub fn start_session<T>(
        &self,
        proposition: &str,
        nodes: [NodeConfig; 3],
        transport: T,
    ) -> Result<SessionHandle, SessionError>
    where
        T: JudgmentTransport + 'static,
    {
        let persona_ids = std::array::from_fn(|i| nodes[i].persona_id.clone());
        let request = JudgmentRequest::new(proposition, persona_ids)?;

        let epoch = self.epochs.fetch_add(1, Ordering::SeqCst) + 1;
        if self
            .active
            .compare_exchange(0, epoch, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SessionError::SessionInProgress);
        }

        let id = uuid::Uuid::new_v4().to_string();
        let state = SessionState::new(&id, &request.issue, nodes);
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);

        info!(session = %id, "starting judgment session");
        let guard = ActiveGuard {
            active: self.active.clone(),
            epoch,
        };
        let join = tokio::spawn(drive(state, transport, request, notices.clone(), guard));

        Ok(SessionHandle {
            id,
            notices,
            join,
            cancelled: AtomicBool::new(false),
            active: self.active.clone(),
            epoch,
        })
    }
}

impl SessionHandle {
    /// The session identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Subscribe to session notices.
    ///
    /// Subscribe before the stream starts delivering; a receiver only
    /// observes notices published after it was created.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionNotice> {
        self.notices.subscribe()
    }

    /// Cancel the session: the drive loop is torn down, in-flight state
    /// discarded, and no further notices are published. Idempotent.
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(session = %self.id, "session cancelled");
        self.join.abort();
        let _ = self
            .active
            .compare_exchange(self.epoch, 0, Ordering::SeqCst, Ordering::SeqCst);
    }

    /// Whether `cancel()` has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Whether the drive loop has ended (verdict, error, or cancellation).
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

/// The drive loop: submit, then reduce events until a terminal phase.
async fn drive<T: JudgmentTransport>(
    mut state: SessionState,
    mut transport: T,
    request: JudgmentRequest,
    notices: broadcast::Sender<SessionNotice>,
    _guard: ActiveGuard,
) {
    // Idle -> Running is the first transition of every session.
    let _ = state.start();

    if let Err(err) = transport.submit(&request).await {
        let cause = format!("submit failed: {err}");
        let _ = state.apply(SessionEvent::StreamFailed {
            cause: cause.clone(),
        });
        publish(&notices, SessionNotice::Error {
            message: cause,
            fatal: true,
        });
        return;
    }

    loop {
        let Some(event) = transport.next_event().await else {
            if !state.phase().is_terminal() {
                let cause = "event channel closed before completion".to_string();
                let _ = state.apply(SessionEvent::StreamFailed {
                    cause: cause.clone(),
                });
                publish(&notices, SessionNotice::Error {
                    message: cause,
                    fatal: true,
                });
            }
            break;
        };

        handle_event(&mut state, event, &notices);

        if state.phase().is_terminal() {
            debug!(status = %state.status_line(), "session reached terminal phase");
            break;
        }
    }
}

/// Translate one wire event into reducer events and notices.
fn handle_event(
    state: &mut SessionState,
    event: JudgeEvent,
    notices: &broadcast::Sender<SessionNotice>,
) {
    match event {
        JudgeEvent::AiComplete { ai, result } => {
            let Some(slot) = state.resolve_label(&ai) else {
                let violation = ProtocolViolation::UnknownWorker { label: ai };
                warn!(%violation, "dropping event");
                publish(notices, SessionNotice::Error {
                    message: violation.to_string(),
                    fatal: false,
                });
                return;
            };

            let result = resolve_report(result);
            match state.apply(SessionEvent::WorkerCompleted {
                slot,
                result: result.clone(),
            }) {
                Ok(Effect::Recorded { slot, completed }) => {
                    publish(notices, SessionNotice::WorkerComplete { slot, result });
                    publish(notices, SessionNotice::Progress { slot, completed });
                }
                Ok(_) => {} // duplicate: suppressed
                Err(violation) => publish(notices, SessionNotice::Error {
                    message: violation.to_string(),
                    fatal: false,
                }),
            }
        }

        JudgeEvent::FinalResult {
            result,
            reasoning,
            severity_level,
            total_score,
            judgment_severity,
            ..
        } => {
            let aggregate = BackendAggregate {
                result,
                reasoning,
                severity_level,
                total_score,
                judgment_severity,
            };
            match state.completed_results() {
                Some(results) => {
                    let verdict = classify(&results, Some(&aggregate));
                    match state.apply(SessionEvent::Finalized {
                        verdict: verdict.clone(),
                    }) {
                        Ok(Effect::Done) => {
                            info!(summary = %verdict.summary_line(), "verdict published");
                            publish(notices, SessionNotice::Verdict(verdict));
                        }
                        Ok(_) => {}
                        Err(violation) => publish(notices, SessionNotice::Error {
                            message: violation.to_string(),
                            fatal: false,
                        }),
                    }
                }
                None => {
                    let violation = ProtocolViolation::PrematureFinalize {
                        completed: state.completed(),
                    };
                    warn!(%violation, "rejecting finalization");
                    publish(notices, SessionNotice::Error {
                        message: violation.to_string(),
                        fatal: false,
                    });
                }
            }
        }

        JudgeEvent::Error { error } => {
            match state.apply(SessionEvent::StreamFailed {
                cause: error.clone(),
            }) {
                Ok(Effect::Errored { cause }) => publish(notices, SessionNotice::Error {
                    message: cause,
                    fatal: true,
                }),
                Ok(_) => {}
                Err(violation) => publish(notices, SessionNotice::Error {
                    message: violation.to_string(),
                    fatal: false,
                }),
            }
        }
    }
}

fn publish(notices: &broadcast::Sender<SessionNotice>, notice: SessionNotice) {
    // No receivers is fine; the session still runs to completion.
    let _ = notices.send(notice);
}
