//! The per-session event-delivery channel, as a trait.
//!
//! The wire transport itself (SSE, sockets, ...) lives outside this
//! crate; a session only needs something it can submit one request to
//! and then pull ordered events from. `ChannelTransport` is the
//! in-process implementation used by tests and the replay binary.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::events::{JudgeEvent, JudgmentRequest};

/// Transport-level error.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to submit judgment request: {0}")]
    SubmitFailed(String),
}

/// A reliable, per-session event-delivery channel.
#[async_trait]
pub trait JudgmentTransport: Send {
    /// Submit the judgment request that opens the session.
    async fn submit(&mut self, request: &JudgmentRequest) -> Result<(), TransportError>;

    /// Pull the next event; `None` means the channel closed.
    async fn next_event(&mut self) -> Option<JudgeEvent>;
}

/// In-process transport backed by unbounded channels.
pub struct ChannelTransport {
    requests: mpsc::UnboundedSender<JudgmentRequest>,
    events: mpsc::UnboundedReceiver<JudgeEvent>,
}

/// The far end of a [`ChannelTransport`]: receives the submission and
/// feeds events back. Dropping it closes the event channel.
pub struct TransportDriver {
    requests: mpsc::UnboundedReceiver<JudgmentRequest>,
    events: mpsc::UnboundedSender<JudgeEvent>,
}

impl ChannelTransport {
    /// Create a connected transport/driver pair.
    pub fn pair() -> (ChannelTransport, TransportDriver) {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        (
            ChannelTransport {
                requests: request_tx,
                events: event_rx,
            },
            TransportDriver {
                requests: request_rx,
                events: event_tx,
            },
        )
    }
}

#[async_trait]
impl JudgmentTransport for ChannelTransport {
    async fn submit(&mut self, request: &JudgmentRequest) -> Result<(), TransportError> {
        self.requests
            .send(request.clone())
            .map_err(|e| TransportError::SubmitFailed(e.to_string()))
    }

    async fn next_event(&mut self) -> Option<JudgeEvent> {
        self.events.recv().await
    }
}

impl TransportDriver {
    /// Deliver one event; returns false when the session side is gone.
    pub fn send_event(&self, event: JudgeEvent) -> bool {
        self.events.send(event).is_ok()
    }

    /// Receive the session's submission.
    pub async fn next_request(&mut self) -> Option<JudgmentRequest> {
        self.requests.recv().await
    }
}
