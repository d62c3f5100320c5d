//! Judgment Session — Controller, Reducer, Slots
//!
//! One session submits a proposition to three fixed worker slots,
//! consumes their completion events in whatever order they arrive, and
//! finalizes into a single verdict once every slot has resolved.
//!
//! # Session Flow
//!
//! ```text
//! Idle → Running ──────────────→ Finalizing ──→ Done
//!   │       │  (3 slots resolved)     │      (verdict stored)
//!   │       │                         │
//!   │       └──────── stream error ───┴──→ Errored
//!   │                        (partials discarded, no verdict)
//!   └─ cancel() at any point tears the loop down silently
//! ```
//!
//! Duplicate completions are idempotent no-ops; a finalization signal
//! before all three slots resolve is a protocol violation, rejected
//! without touching state.

pub mod controller;
pub mod reducer;
pub mod slots;
pub mod state;

pub use controller::{SessionController, SessionError, SessionHandle, SessionNotice};
pub use reducer::{Effect, ProtocolViolation, SessionEvent};
pub use slots::{SlotId, SlotTable};
pub use state::{SessionPhase, SessionState, TransitionError, TransitionRecord};
