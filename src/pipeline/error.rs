use thiserror::Error;

use crate::remote::RemoteError;
use crate::reports::StoreError;

use super::state::SessionStatus;

/// Errors returned by [`SessionController`](super::SessionController)
/// operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Missing or unreadable image, or otherwise malformed input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The operation is not allowed in the current state.
    #[error("cannot {operation} while {status}")]
    InvalidState {
        operation: &'static str,
        status: SessionStatus,
    },

    /// Analysis or speech synthesis failed. The session is now `Failed`.
    #[error("remote call failed: {0}")]
    Remote(#[from] RemoteError),

    /// A report could not be written.
    #[error("failed to save report: {0}")]
    Persistence(#[from] StoreError),

    /// A playback handle no longer names the loaded audio.
    #[error("stale playback handle")]
    InvalidHandle,
}

impl SessionError {
    pub(crate) fn invalid_state(operation: &'static str, status: SessionStatus) -> Self {
        SessionError::InvalidState { operation, status }
    }
}
