//! Transfer lifecycle shared by the upload and download pipelines.

use tracing::{debug, warn};

/// Lifecycle state of one transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    /// Nothing started yet.
    Idle,
    /// WebSocket handshake in progress.
    Connecting,
    /// Exchanging data. `step` counts acknowledged chunks (upload) or
    /// received fragments (download).
    Active { step: u64 },
    /// The server's close frame is being evaluated.
    Closing,
    /// Finished successfully.
    Completed,
    /// Aborted by an error.
    Failed,
    /// Aborted by the caller.
    Cancelled,
}

impl TransferState {
    /// Returns `true` for states a transfer never leaves.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransferState::Completed | TransferState::Failed | TransferState::Cancelled
        )
    }

    /// Returns `true` if moving from `self` to `next` is allowed.
    pub fn can_transition_to(&self, next: TransferState) -> bool {
        use TransferState::*;

        if self.is_terminal() {
            return false;
        }
        match (*self, next) {
            (_, Failed) | (_, Cancelled) => true,
            (Idle, Connecting) => true,
            (Connecting, Active { step: 0 }) => true,
            (Active { step: a }, Active { step: b }) => b == a + 1,
            (Active { .. }, Closing) => true,
            (Closing, Completed) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for TransferState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferState::Idle => f.write_str("idle"),
            TransferState::Connecting => f.write_str("connecting"),
            TransferState::Active { step } => write!(f, "active({step})"),
            TransferState::Closing => f.write_str("closing"),
            TransferState::Completed => f.write_str("completed"),
            TransferState::Failed => f.write_str("failed"),
            TransferState::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Tracks and logs the state of one pipeline run.
#[derive(Debug)]
pub(crate) struct StateTracker {
    label: &'static str,
    state: TransferState,
}

impl StateTracker {
    pub(crate) fn new(label: &'static str) -> Self {
        Self {
            label,
            state: TransferState::Idle,
        }
    }

    pub(crate) fn state(&self) -> TransferState {
        self.state
    }

    /// Moves to `next`. Illegal transitions are logged and ignored.
    pub(crate) fn advance(&mut self, next: TransferState) -> bool {
        if !self.state.can_transition_to(next) {
            warn!(
                transfer = self.label,
                from = %self.state,
                to = %next,
                "ignoring illegal state transition"
            );
            return false;
        }
        debug!(transfer = self.label, from = %self.state, to = %next, "state transition");
        self.state = next;
        true
    }

    /// Records the terminal state matching a pipeline result.
    pub(crate) fn finish<T>(&mut self, result: &Result<T, crate::TransferClientError>) {
        let next = match result {
            Ok(_) => TransferState::Completed,
            Err(crate::TransferClientError::Cancelled) => TransferState::Cancelled,
            Err(_) => TransferState::Failed,
        };
        self.advance(next);
    }
}
