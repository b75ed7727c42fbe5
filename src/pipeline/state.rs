//! Session state machine and the events it publishes.
//!
//! [`SessionState`] is a single tagged value: each variant carries exactly
//! the data that exists in that phase, so combinations such as "playing
//! while analysing" cannot be expressed. [`SessionStatus`] is its data-free
//! projection for labels and comparisons.

use std::fmt;

use crate::audio::PlaybackHandle;
use crate::remote::RemoteError;
use crate::reports::Report;

use super::narration::Advisory;

// ---------------------------------------------------------------------------
// ImageRef / DiagnosticSession
// ---------------------------------------------------------------------------

/// Opaque handle to the selected picture (a path or `file://` URI).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef(String);

impl ImageRef {
    /// `None` when `raw` is empty or whitespace.
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The inputs of one diagnosis. Fixed when the image is selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticSession {
    pub image: ImageRef,
    /// Free-text vehicle description (make / model / year).
    pub context: Option<String>,
}

// ---------------------------------------------------------------------------
// SessionStatus
// ---------------------------------------------------------------------------

/// Phases of a diagnostic session.
///
/// ```text
/// Idle ──select_image──▶ ImageSelected ──submit──▶ Analyzing
///      ──analysis ok──▶ Analyzed ──(auto)──▶ Synthesizing
///      ──speech ok──▶ Ready
/// Analyzing / Synthesizing ──remote error──▶ Failed
/// any ──reset──▶ Idle        any ──select_image──▶ ImageSelected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionStatus {
    #[default]
    Idle,
    ImageSelected,
    Analyzing,
    Analyzed,
    Synthesizing,
    Ready,
    Failed,
}

impl SessionStatus {
    /// `true` while a remote call for the session is outstanding.
    ///
    /// ```
    /// use car_doctor::pipeline::SessionStatus;
    ///
    /// assert!(!SessionStatus::Idle.is_busy());
    /// assert!(SessionStatus::Analyzing.is_busy());
    /// assert!(SessionStatus::Synthesizing.is_busy());
    /// assert!(!SessionStatus::Ready.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            SessionStatus::Analyzing | SessionStatus::Analyzed | SessionStatus::Synthesizing
        )
    }

    /// A short human-readable label for status lines.
    pub fn label(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "Idle",
            SessionStatus::ImageSelected => "Image selected",
            SessionStatus::Analyzing => "Analyzing car image...",
            SessionStatus::Analyzed => "Analyzed",
            SessionStatus::Synthesizing => "Generating voice...",
            SessionStatus::Ready => "Ready",
            SessionStatus::Failed => "Failed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    ImageSelected(DiagnosticSession),
    Analyzing(DiagnosticSession),
    Analyzed {
        session: DiagnosticSession,
        narration: String,
    },
    Synthesizing {
        session: DiagnosticSession,
        narration: String,
    },
    Ready {
        session: DiagnosticSession,
        narration: String,
        playback: PlaybackHandle,
    },
    Failed {
        session: DiagnosticSession,
        /// Present when analysis succeeded and synthesis failed.
        narration: Option<String>,
        error: RemoteError,
    },
}

impl SessionState {
    pub fn status(&self) -> SessionStatus {
        match self {
            SessionState::Idle => SessionStatus::Idle,
            SessionState::ImageSelected(_) => SessionStatus::ImageSelected,
            SessionState::Analyzing(_) => SessionStatus::Analyzing,
            SessionState::Analyzed { .. } => SessionStatus::Analyzed,
            SessionState::Synthesizing { .. } => SessionStatus::Synthesizing,
            SessionState::Ready { .. } => SessionStatus::Ready,
            SessionState::Failed { .. } => SessionStatus::Failed,
        }
    }

    pub fn session(&self) -> Option<&DiagnosticSession> {
        match self {
            SessionState::Idle => None,
            SessionState::ImageSelected(s) | SessionState::Analyzing(s) => Some(s),
            SessionState::Analyzed { session, .. }
            | SessionState::Synthesizing { session, .. }
            | SessionState::Ready { session, .. }
            | SessionState::Failed { session, .. } => Some(session),
        }
    }

    /// The sanitized narration, once analysis has produced one.
    pub fn narration(&self) -> Option<&str> {
        match self {
            SessionState::Analyzed { narration, .. }
            | SessionState::Synthesizing { narration, .. }
            | SessionState::Ready { narration, .. } => Some(narration),
            SessionState::Failed { narration, .. } => narration.as_deref(),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&RemoteError> {
        match self {
            SessionState::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn playback(&self) -> Option<PlaybackHandle> {
        match self {
            SessionState::Ready { playback, .. } => Some(*playback),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionEvent
// ---------------------------------------------------------------------------

/// Notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The live session moved to `status`.
    StatusChanged {
        generation: u64,
        status: SessionStatus,
    },
    /// An advisory prompt derived from the narration.
    Advisory(Advisory),
    /// Narration audio reached its end.
    PlaybackFinished,
    /// A report was persisted.
    ReportSaved(Report),
    /// A standalone, user-facing message (e.g. a failed save).
    Notice(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> DiagnosticSession {
        DiagnosticSession {
            image: ImageRef::new("/tmp/dash.jpg").unwrap(),
            context: None,
        }
    }

    #[test]
    fn image_ref_rejects_blank() {
        assert!(ImageRef::new("").is_none());
        assert!(ImageRef::new("   ").is_none());
        assert_eq!(ImageRef::new(" a.jpg ").unwrap().as_str(), "a.jpg");
    }

    #[test]
    fn default_state_is_idle() {
        assert_eq!(SessionState::default(), SessionState::Idle);
        assert_eq!(SessionState::default().status(), SessionStatus::Idle);
    }

    #[test]
    fn narration_only_after_analysis() {
        assert_eq!(SessionState::ImageSelected(session()).narration(), None);
        assert_eq!(SessionState::Analyzing(session()).narration(), None);

        let synth = SessionState::Synthesizing {
            session: session(),
            narration: "text".into(),
        };
        assert_eq!(synth.narration(), Some("text"));
        assert_eq!(synth.status(), SessionStatus::Synthesizing);
    }

    #[test]
    fn failed_exposes_error() {
        let failed = SessionState::Failed {
            session: session(),
            narration: None,
            error: RemoteError::Timeout,
        };
        assert_eq!(failed.status(), SessionStatus::Failed);
        assert_eq!(failed.error(), Some(&RemoteError::Timeout));
        assert!(failed.playback().is_none());
    }

    #[test]
    fn busy_states() {
        assert!(!SessionStatus::ImageSelected.is_busy());
        assert!(SessionStatus::Analyzed.is_busy());
        assert!(!SessionStatus::Failed.is_busy());
    }

    #[test]
    fn labels() {
        assert_eq!(SessionStatus::Analyzing.label(), "Analyzing car image...");
        assert_eq!(SessionStatus::Synthesizing.to_string(), "Generating voice...");
    }
}
