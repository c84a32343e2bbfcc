use std::sync::atomic::{AtomicU8, Ordering};
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Relay session states. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Connecting = 0,
    Streaming = 1,
    Closed = 2,
}

impl From<u8> for SessionState {
    fn from(value: u8) -> Self {
        match value {
            0 => SessionState::Connecting,
            1 => SessionState::Streaming,
            _ => SessionState::Closed,
        }
    }
}

/// Once-only termination guard shared by every path that can end a session.
///
/// Client disconnect, upstream completion, upstream failure and server
/// shutdown may all race to close a session; `close` lets exactly one of them
/// perform teardown.
#[derive(Debug)]
pub struct Lifecycle {
    state: AtomicU8,
    token: CancellationToken,
}

impl Lifecycle {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            state: AtomicU8::new(SessionState::Connecting as u8),
            token,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.load(Ordering::Acquire).into()
    }

    pub fn is_closed(&self) -> bool {
        self.state() == SessionState::Closed
    }

    /// Moves `connecting → streaming`. Returns false if the session already
    /// left `connecting`.
    pub fn begin_streaming(&self) -> bool {
        self.state
            .compare_exchange(
                SessionState::Connecting as u8,
                SessionState::Streaming as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Moves the session to `closed` and cancels its token.
    /// Returns true only for the caller that performed the transition.
    pub fn close(&self) -> bool {
        let previous = self
            .state
            .swap(SessionState::Closed as u8, Ordering::AcqRel);
        if previous == SessionState::Closed as u8 {
            return false;
        }
        self.token.cancel();
        true
    }

    /// Resolves once the session is closed or its parent (server shutdown) is cancelled.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
