//! Session controller: drives one diagnosis from image to spoken narration.
//!
//! # Flow
//!
//! ```text
//! select_image ──▶ ImageSelected
//! submit
//!   ├─ read image bytes            (failure → InvalidInput, back to ImageSelected)
//!   ├─ AnalysisClient::analyze     [Analyzing]     (error → Failed)
//!   ├─ sanitize + advisories       [Analyzed]
//!   ├─ SpeechClient::synthesize    [Synthesizing]  (error → Failed)
//!   └─ load + play narration       [Ready]
//! save_report (Ready only) ──▶ ReportStore::create
//! ```
//!
//! Every `select_image` / `reset` bumps a generation counter. An in-flight
//! `submit` re-checks the generation after each await and drops its result if
//! the session it started for has been replaced.
//!
//! Lock order is `inner` then `playback`. Neither lock is held across an
//! await.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;

use crate::audio::AudioPlaybackManager;
use crate::remote::{AnalysisClient, RemoteError, SpeechClient, Voice};
use crate::reports::{Report, ReportStore};

use super::error::SessionError;
use super::image::ImageLoader;
use super::narration::{detect_advisories, sanitize_narration, NO_DESCRIPTION};
use super::state::{DiagnosticSession, ImageRef, SessionEvent, SessionState, SessionStatus};

struct Inner {
    generation: u64,
    state: SessionState,
    voice: Voice,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// SessionController
// ---------------------------------------------------------------------------

/// Owns the current diagnostic session and the narration playback.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use car_doctor::audio::{AudioPlaybackManager, RodioBackend};
/// use car_doctor::config::AppConfig;
/// use car_doctor::pipeline::{FsImageLoader, SessionController};
/// use car_doctor::remote::{OpenAiAnalysisClient, OpenAiSpeechClient};
/// use car_doctor::reports::{MemoryStorage, ReportStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = AppConfig::default();
/// let (controller, mut events) = SessionController::new(
///     Arc::new(OpenAiAnalysisClient::from_config(&config.openai, &config.analysis)),
///     Arc::new(OpenAiSpeechClient::from_config(&config.openai, &config.speech)),
///     Arc::new(FsImageLoader),
///     Arc::new(ReportStore::new(Arc::new(MemoryStorage::new()), "car_report_")),
///     AudioPlaybackManager::new(RodioBackend::new()?),
///     config.speech.voice,
/// );
///
/// controller.select_image("dashboard.jpg", Some("2014 Honda Civic"))?;
/// controller.submit().await?;
/// println!("{}", controller.narration().unwrap_or_default());
/// controller.save_report().await?;
/// # let _ = events.recv().await;
/// # Ok(())
/// # }
/// ```
pub struct SessionController {
    analysis: Arc<dyn AnalysisClient>,
    speech: Arc<dyn SpeechClient>,
    images: Arc<dyn ImageLoader>,
    store: Arc<ReportStore>,
    inner: Mutex<Inner>,
    playback: Mutex<AudioPlaybackManager>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionController {
    /// Build a controller in `Idle`, returning the receiving end of its event
    /// stream.
    pub fn new(
        analysis: Arc<dyn AnalysisClient>,
        speech: Arc<dyn SpeechClient>,
        images: Arc<dyn ImageLoader>,
        store: Arc<ReportStore>,
        playback: AudioPlaybackManager,
        voice: Voice,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let controller = Self {
            analysis,
            speech,
            images,
            store,
            inner: Mutex::new(Inner {
                generation: 0,
                state: SessionState::Idle,
                voice,
            }),
            playback: Mutex::new(playback),
            events,
        };
        (controller, rx)
    }

    // -- session lifecycle ---------------------------------------------------

    /// Start a new session for `image`, discarding whatever was in progress.
    ///
    /// Returns the new session generation.
    pub fn select_image(&self, image: &str, context: Option<&str>) -> Result<u64, SessionError> {
        let image = ImageRef::new(image)
            .ok_or_else(|| SessionError::InvalidInput("no image selected".into()))?;
        let context = context
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        let mut inner = lock(&self.inner);
        inner.generation += 1;
        lock(&self.playback).release_current();
        inner.state = SessionState::ImageSelected(DiagnosticSession { image, context });

        log::info!("session #{}: image selected", inner.generation);
        self.emit_status(&inner);
        Ok(inner.generation)
    }

    /// Return to `Idle`, stopping playback and orphaning any in-flight work.
    pub fn reset(&self) {
        let mut inner = lock(&self.inner);
        inner.generation += 1;
        lock(&self.playback).release_current();
        inner.state = SessionState::Idle;

        log::debug!("session reset (generation {})", inner.generation);
        self.emit_status(&inner);
    }

    /// Analyse the selected image, synthesise the narration and start
    /// playing it.
    ///
    /// Allowed only from `ImageSelected`. If the session is replaced or reset
    /// while this is in flight, the late result is dropped and `Ok(())` is
    /// returned.
    pub async fn submit(&self) -> Result<(), SessionError> {
        let (generation, session) = {
            let mut inner = lock(&self.inner);
            let session = match &inner.state {
                SessionState::ImageSelected(session) => session.clone(),
                other => return Err(SessionError::invalid_state("submit", other.status())),
            };
            inner.state = SessionState::Analyzing(session.clone());
            self.emit_status(&inner);
            (inner.generation, session)
        };

        // -- image -----------------------------------------------------------
        let image = match self.images.load(&session.image).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let current = self.update_if_current(generation, |inner| {
                    inner.state = SessionState::ImageSelected(session.clone());
                });
                if !current {
                    log::debug!("session #{generation}: discarding stale image error ({e})");
                    return Ok(());
                }
                log::warn!("session #{generation}: cannot read {}: {e}", session.image);
                return Err(SessionError::InvalidInput(format!(
                    "cannot read image {}: {e}",
                    session.image
                )));
            }
        };

        // -- analysis --------------------------------------------------------
        let raw = match self.analysis.analyze(&image, session.context.as_deref()).await {
            Ok(text) => text,
            Err(e) => return self.fail(generation, session, None, e),
        };

        let mut narration = sanitize_narration(&raw);
        if narration.trim().is_empty() {
            log::warn!("session #{generation}: empty analysis response");
            narration = NO_DESCRIPTION.to_string();
        }

        let voice = {
            let mut inner = lock(&self.inner);
            if inner.generation != generation {
                log::debug!("session #{generation}: discarding stale analysis");
                return Ok(());
            }
            inner.state = SessionState::Analyzed {
                session: session.clone(),
                narration: narration.clone(),
            };
            self.emit_status(&inner);
            for advisory in detect_advisories(&narration) {
                self.emit(SessionEvent::Advisory(advisory));
            }
            inner.state = SessionState::Synthesizing {
                session: session.clone(),
                narration: narration.clone(),
            };
            self.emit_status(&inner);
            inner.voice
        };

        // -- speech ----------------------------------------------------------
        let audio = match self.speech.synthesize(&narration, voice).await {
            Ok(audio) => audio,
            Err(e) => return self.fail(generation, session, Some(narration), e),
        };

        // -- playback --------------------------------------------------------
        let mut inner = lock(&self.inner);
        if inner.generation != generation {
            log::debug!("session #{generation}: discarding stale narration audio");
            return Ok(());
        }

        let mut playback = lock(&self.playback);
        let started = playback.load(audio).and_then(|handle| {
            let events = self.events.clone();
            playback.on_completion(
                handle,
                Box::new(move || {
                    let _ = events.send(SessionEvent::PlaybackFinished);
                }),
            )?;
            playback.play(handle)?;
            Ok(handle)
        });

        match started {
            Ok(handle) => {
                inner.state = SessionState::Ready {
                    session,
                    narration,
                    playback: handle,
                };
                log::info!("session #{generation}: narration ready ({voice} voice)");
                self.emit_status(&inner);
                Ok(())
            }
            Err(e) => {
                playback.release_current();
                drop(playback);
                log::error!("session #{generation}: narration audio unusable: {e}");
                let error = RemoteError::Parse(format!("narration audio unusable: {e}"));
                inner.state = SessionState::Failed {
                    session,
                    narration: Some(narration),
                    error: error.clone(),
                };
                self.emit_status(&inner);
                Err(SessionError::Remote(error))
            }
        }
    }

    // -- reports -------------------------------------------------------------

    /// Persist the narration of a `Ready` session.
    ///
    /// A storage failure leaves the session untouched and is also reported as
    /// a [`SessionEvent::Notice`].
    pub async fn save_report(&self) -> Result<Report, SessionError> {
        let narration = {
            let inner = lock(&self.inner);
            match &inner.state {
                SessionState::Ready { narration, .. } => narration.clone(),
                other => {
                    return Err(SessionError::invalid_state("save a report", other.status()))
                }
            }
        };

        match self.store.create(&narration).await {
            Ok(report) => {
                self.emit(SessionEvent::ReportSaved(report.clone()));
                Ok(report)
            }
            Err(e) => {
                log::error!("failed to save report: {e}");
                self.emit(SessionEvent::Notice(format!("Failed to save report: {e}")));
                Err(SessionError::Persistence(e))
            }
        }
    }

    // -- playback ------------------------------------------------------------

    /// Pause if playing, otherwise play. Returns whether audio is now
    /// playing. Only meaningful in `Ready`.
    pub fn toggle_playback(&self) -> Result<bool, SessionError> {
        let inner = lock(&self.inner);
        let Some(handle) = inner.state.playback() else {
            return Err(SessionError::invalid_state(
                "control playback",
                inner.state.status(),
            ));
        };

        let mut playback = lock(&self.playback);
        let result = if playback.is_playing(handle) {
            playback.pause(handle)
        } else {
            playback.play(handle)
        };
        result.map_err(|_| SessionError::InvalidHandle)?;
        Ok(playback.is_playing(handle))
    }

    pub fn is_playing(&self) -> bool {
        let inner = lock(&self.inner);
        inner
            .state
            .playback()
            .is_some_and(|handle| lock(&self.playback).is_playing(handle))
    }

    // -- accessors -----------------------------------------------------------

    /// Voice used for the next synthesis.
    pub fn set_voice(&self, voice: Voice) {
        lock(&self.inner).voice = voice;
    }

    pub fn voice(&self) -> Voice {
        lock(&self.inner).voice
    }

    pub fn status(&self) -> SessionStatus {
        lock(&self.inner).state.status()
    }

    /// Snapshot of the full session state.
    pub fn state(&self) -> SessionState {
        lock(&self.inner).state.clone()
    }

    /// The narration of the current session, once analysis has produced
    /// one.
    pub fn narration(&self) -> Option<String> {
        lock(&self.inner).state.narration().map(str::to_string)
    }

    pub fn generation(&self) -> u64 {
        lock(&self.inner).generation
    }

    // -- internals -----------------------------------------------------------

    fn fail(
        &self,
        generation: u64,
        session: DiagnosticSession,
        narration: Option<String>,
        error: RemoteError,
    ) -> Result<(), SessionError> {
        let mut inner = lock(&self.inner);
        if inner.generation != generation {
            log::debug!("session #{generation}: discarding stale failure ({error})");
            return Ok(());
        }
        log::error!("session #{generation}: {error}");
        inner.state = SessionState::Failed {
            session,
            narration,
            error: error.clone(),
        };
        self.emit_status(&inner);
        Err(SessionError::Remote(error))
    }

    /// Apply `apply` only while `generation` is still live. Returns whether it
    /// ran.
    fn update_if_current(&self, generation: u64, apply: impl FnOnce(&mut Inner)) -> bool {
        let mut inner = lock(&self.inner);
        if inner.generation != generation {
            return false;
        }
        apply(&mut inner);
        self.emit_status(&inner);
        true
    }

    fn emit_status(&self, inner: &Inner) {
        self.emit(SessionEvent::StatusChanged {
            generation: inner.generation,
            status: inner.state.status(),
        });
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{FakePlaybackBackend, PlaybackTracker};
    use crate::pipeline::Advisory;
    use crate::remote::{MockAnalysisClient, MockSpeechClient};
    use crate::reports::{KeyValueStorage, MemoryStorage, StoreError};
    use async_trait::async_trait;
    use tokio::sync::Notify;

    /// Serves fixed bytes for any image except names containing "missing".
    struct StubImages;

    #[async_trait]
    impl ImageLoader for StubImages {
        async fn load(&self, image: &ImageRef) -> std::io::Result<Vec<u8>> {
            if image.as_str().contains("missing") {
                Err(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"))
            } else {
                Ok(vec![0xFF, 0xD8])
            }
        }
    }

    /// Blocks each analysis until `gate` is notified.
    struct GatedAnalysis {
        gate: Arc<Notify>,
        response: Result<String, RemoteError>,
    }

    impl GatedAnalysis {
        fn ok(gate: &Arc<Notify>, text: &str) -> Self {
            Self {
                gate: Arc::clone(gate),
                response: Ok(text.to_string()),
            }
        }

        fn err(gate: &Arc<Notify>, error: RemoteError) -> Self {
            Self {
                gate: Arc::clone(gate),
                response: Err(error),
            }
        }
    }

    #[async_trait]
    impl AnalysisClient for GatedAnalysis {
        async fn analyze(&self, _image: &[u8], _ctx: Option<&str>) -> Result<String, RemoteError> {
            self.gate.notified().await;
            self.response.clone()
        }
    }

    /// Blocks each synthesis until `gate` is notified.
    struct GatedSpeech {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl SpeechClient for GatedSpeech {
        async fn synthesize(&self, _text: &str, _voice: Voice) -> Result<Vec<u8>, RemoteError> {
            self.gate.notified().await;
            Ok(vec![1, 2, 3])
        }
    }

    /// Blocks each read until `gate` is notified, then reports the file gone.
    struct GatedImages {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl ImageLoader for GatedImages {
        async fn load(&self, _image: &ImageRef) -> std::io::Result<Vec<u8>> {
            self.gate.notified().await;
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "deleted"))
        }
    }

    /// Storage whose writes always fail.
    struct BrokenStorage;

    #[async_trait]
    impl KeyValueStorage for BrokenStorage {
        async fn all_keys(&self) -> Result<Vec<String>, StoreError> {
            Ok(Vec::new())
        }
        async fn get_many(
            &self,
            keys: &[String],
        ) -> Result<Vec<(String, Option<String>)>, StoreError> {
            Ok(keys.iter().map(|k| (k.clone(), None)).collect())
        }
        async fn set(&self, _key: &str, _value: String) -> Result<(), StoreError> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
        }
        async fn remove(&self, _key: &str) -> Result<(), StoreError> {
            Ok(())
        }
        async fn remove_many(&self, _keys: &[String]) -> Result<(), StoreError> {
            Ok(())
        }
    }

    struct Harness {
        controller: SessionController,
        events: mpsc::UnboundedReceiver<SessionEvent>,
        tracker: PlaybackTracker,
        store: Arc<ReportStore>,
        speech: Arc<MockSpeechClient>,
    }

    fn harness_with(
        analysis: Arc<dyn AnalysisClient>,
        speech: MockSpeechClient,
        storage: Arc<dyn KeyValueStorage>,
    ) -> Harness {
        let (backend, tracker) = FakePlaybackBackend::new();
        let store = Arc::new(ReportStore::new(storage, "car_report_"));
        let speech = Arc::new(speech);
        let (controller, events) = SessionController::new(
            analysis,
            speech.clone(),
            Arc::new(StubImages),
            store.clone(),
            AudioPlaybackManager::new(backend),
            Voice::Alloy,
        );
        Harness {
            controller,
            events,
            tracker,
            store,
            speech,
        }
    }

    /// Controller with caller-supplied speech and image collaborators.
    fn controller_with(
        analysis: Arc<dyn AnalysisClient>,
        speech: Arc<dyn SpeechClient>,
        images: Arc<dyn ImageLoader>,
    ) -> (SessionController, PlaybackTracker) {
        let (backend, tracker) = FakePlaybackBackend::new();
        let store = Arc::new(ReportStore::new(
            Arc::new(MemoryStorage::new()),
            "car_report_",
        ));
        let (controller, _events) = SessionController::new(
            analysis,
            speech,
            images,
            store,
            AudioPlaybackManager::new(backend),
            Voice::Alloy,
        );
        (controller, tracker)
    }

    fn harness(analysis: MockAnalysisClient) -> Harness {
        harness_with(
            Arc::new(analysis),
            MockSpeechClient::ok(vec![1, 2, 3]),
            Arc::new(MemoryStorage::new()),
        )
    }

    fn drain(events: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut out = Vec::new();
        while let Ok(event) = events.try_recv() {
            out.push(event);
        }
        out
    }

    fn statuses(events: &[SessionEvent]) -> Vec<SessionStatus> {
        events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::StatusChanged { status, .. } => Some(*status),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn full_pipeline_reaches_ready_and_plays() {
        let mut h = harness(MockAnalysisClient::ok("Check engine oil level. # Findings"));

        h.controller
            .select_image("/photos/engine.jpg", Some(" 2014 Honda Civic "))
            .unwrap();
        h.controller.submit().await.unwrap();

        let state = h.controller.state();
        assert_eq!(state.status(), SessionStatus::Ready);
        assert_eq!(state.narration(), Some("Check engine oil level. 🔧🚗 Findings"));
        assert!(h.controller.is_playing());
        assert_eq!(h.tracker.live(), 1);

        // Narration spoken is the narration displayed.
        let spoken = h.speech.calls();
        assert_eq!(spoken.len(), 1);
        assert_eq!(spoken[0].0, "Check engine oil level. 🔧🚗 Findings");
        assert_eq!(spoken[0].1, Voice::Alloy);

        let events = drain(&mut h.events);
        assert_eq!(
            statuses(&events),
            vec![
                SessionStatus::ImageSelected,
                SessionStatus::Analyzing,
                SessionStatus::Analyzed,
                SessionStatus::Synthesizing,
                SessionStatus::Ready,
            ]
        );
        assert!(events.contains(&SessionEvent::Advisory(Advisory::MileageSinceService)));
    }

    #[tokio::test]
    async fn vehicle_context_is_trimmed_and_forwarded() {
        let analysis = Arc::new(MockAnalysisClient::ok("Looks fine."));
        let h = harness_with(
            analysis.clone(),
            MockSpeechClient::ok(vec![1]),
            Arc::new(MemoryStorage::new()),
        );

        h.controller.select_image("a.jpg", Some("  ")).unwrap();
        h.controller.submit().await.unwrap();
        h.controller.select_image("b.jpg", Some(" Ford F-150 ")).unwrap();
        h.controller.submit().await.unwrap();

        assert_eq!(analysis.calls(), vec![None, Some("Ford F-150".to_string())]);
    }

    #[tokio::test]
    async fn selected_voice_is_used_for_synthesis() {
        let h = harness(MockAnalysisClient::ok("Brake pads worn."));
        h.controller.set_voice(Voice::Onyx);

        h.controller.select_image("brakes.jpg", None).unwrap();
        h.controller.submit().await.unwrap();

        assert_eq!(h.speech.calls()[0].1, Voice::Onyx);
        assert_eq!(h.controller.voice(), Voice::Onyx);
    }

    #[tokio::test]
    async fn empty_analysis_uses_placeholder() {
        let h = harness(MockAnalysisClient::ok(""));
        h.controller.select_image("dash.jpg", None).unwrap();
        h.controller.submit().await.unwrap();

        assert_eq!(h.controller.narration().as_deref(), Some(NO_DESCRIPTION));
        assert_eq!(h.speech.calls()[0].0, NO_DESCRIPTION);
    }

    #[tokio::test]
    async fn analysis_failure_moves_to_failed_without_retry() {
        let analysis = Arc::new(MockAnalysisClient::err(RemoteError::Timeout));
        let h = harness_with(
            analysis.clone(),
            MockSpeechClient::ok(vec![1]),
            Arc::new(MemoryStorage::new()),
        );

        h.controller.select_image("dash.jpg", None).unwrap();
        let err = h.controller.submit().await.unwrap_err();

        assert!(matches!(err, SessionError::Remote(RemoteError::Timeout)));
        assert_eq!(analysis.calls().len(), 1);
        assert!(h.speech.calls().is_empty());
        let state = h.controller.state();
        assert_eq!(state.status(), SessionStatus::Failed);
        assert_eq!(state.error(), Some(&RemoteError::Timeout));
        assert_eq!(state.narration(), None);
    }

    #[tokio::test]
    async fn speech_failure_keeps_narration() {
        let h = harness_with(
            Arc::new(MockAnalysisClient::ok("Coolant is low.")),
            MockSpeechClient::err(RemoteError::Status {
                status: 500,
                message: "server error".into(),
            }),
            Arc::new(MemoryStorage::new()),
        );

        h.controller.select_image("dash.jpg", None).unwrap();
        assert!(h.controller.submit().await.is_err());

        let state = h.controller.state();
        assert_eq!(state.status(), SessionStatus::Failed);
        assert_eq!(state.narration(), Some("Coolant is low."));
        assert_eq!(h.tracker.live(), 0);
    }

    #[tokio::test]
    async fn undecodable_audio_fails_session() {
        let h = harness_with(
            Arc::new(MockAnalysisClient::ok("Coolant is low.")),
            MockSpeechClient::ok(Vec::new()),
            Arc::new(MemoryStorage::new()),
        );

        h.controller.select_image("dash.jpg", None).unwrap();
        let err = h.controller.submit().await.unwrap_err();

        assert!(matches!(err, SessionError::Remote(RemoteError::Parse(_))));
        assert_eq!(h.controller.status(), SessionStatus::Failed);
        assert_eq!(h.tracker.live(), 0);
    }

    #[tokio::test]
    async fn unreadable_image_is_invalid_input() {
        let analysis = Arc::new(MockAnalysisClient::ok("unused"));
        let h = harness_with(
            analysis.clone(),
            MockSpeechClient::ok(vec![1]),
            Arc::new(MemoryStorage::new()),
        );

        h.controller.select_image("missing.jpg", None).unwrap();
        let err = h.controller.submit().await.unwrap_err();

        assert!(matches!(err, SessionError::InvalidInput(_)));
        assert_eq!(h.controller.status(), SessionStatus::ImageSelected);
        assert!(analysis.calls().is_empty());
    }

    #[tokio::test]
    async fn blank_image_is_rejected() {
        let h = harness(MockAnalysisClient::ok("unused"));
        assert!(matches!(
            h.controller.select_image("  ", None),
            Err(SessionError::InvalidInput(_))
        ));
        assert_eq!(h.controller.status(), SessionStatus::Idle);
    }

    #[tokio::test]
    async fn submit_requires_selected_image() {
        let h = harness(MockAnalysisClient::ok("text"));
        let err = h.controller.submit().await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidState {
                status: SessionStatus::Idle,
                ..
            }
        ));

        h.controller.select_image("dash.jpg", None).unwrap();
        h.controller.submit().await.unwrap();
        assert!(matches!(
            h.controller.submit().await,
            Err(SessionError::InvalidState {
                status: SessionStatus::Ready,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn concurrent_submit_is_rejected() {
        let gate = Arc::new(Notify::new());
        let h = harness_with(
            Arc::new(GatedAnalysis::ok(&gate, "ok")),
            MockSpeechClient::ok(vec![1]),
            Arc::new(MemoryStorage::new()),
        );
        h.controller.select_image("dash.jpg", None).unwrap();

        let (first, second) = tokio::join!(h.controller.submit(), async {
            let second = h.controller.submit().await;
            gate.notify_one();
            second
        });

        assert!(first.is_ok());
        assert!(matches!(
            second,
            Err(SessionError::InvalidState {
                status: SessionStatus::Analyzing,
                ..
            })
        ));
        assert_eq!(h.controller.status(), SessionStatus::Ready);
    }

    #[tokio::test]
    async fn new_image_during_analysis_discards_stale_result() {
        let gate = Arc::new(Notify::new());
        let h = harness_with(
            Arc::new(GatedAnalysis::ok(&gate, "old engine")),
            MockSpeechClient::ok(vec![1]),
            Arc::new(MemoryStorage::new()),
        );
        h.controller.select_image("first.jpg", None).unwrap();

        let (outcome, _) = tokio::join!(h.controller.submit(), async {
            h.controller.select_image("second.jpg", None).unwrap();
            gate.notify_one();
        });

        assert!(outcome.is_ok());
        let state = h.controller.state();
        assert_eq!(state.status(), SessionStatus::ImageSelected);
        assert_eq!(state.session().unwrap().image.as_str(), "second.jpg");
        assert_eq!(state.narration(), None);
        assert!(h.speech.calls().is_empty());
        assert_eq!(h.tracker.live(), 0);
    }

    #[tokio::test]
    async fn reset_during_analysis_stays_idle() {
        let gate = Arc::new(Notify::new());
        let h = harness_with(
            Arc::new(GatedAnalysis::ok(&gate, "late")),
            MockSpeechClient::ok(vec![1]),
            Arc::new(MemoryStorage::new()),
        );
        h.controller.select_image("dash.jpg", None).unwrap();

        let (outcome, _) = tokio::join!(h.controller.submit(), async {
            h.controller.reset();
            gate.notify_one();
        });

        assert!(outcome.is_ok());
        assert_eq!(h.controller.status(), SessionStatus::Idle);
    }

    #[tokio::test]
    async fn new_image_during_synthesis_discards_stale_audio() {
        let gate = Arc::new(Notify::new());
        let (controller, tracker) = controller_with(
            Arc::new(MockAnalysisClient::ok("Coolant hose is split.")),
            Arc::new(GatedSpeech { gate: gate.clone() }),
            Arc::new(StubImages),
        );
        controller.select_image("first.jpg", None).unwrap();

        let (outcome, _) = tokio::join!(controller.submit(), async {
            // Let analysis finish so the pipeline is parked in synthesis.
            while controller.status() != SessionStatus::Synthesizing {
                tokio::task::yield_now().await;
            }
            controller.select_image("second.jpg", None).unwrap();
            gate.notify_one();
        });

        assert!(outcome.is_ok());
        let state = controller.state();
        assert_eq!(state.status(), SessionStatus::ImageSelected);
        assert_eq!(state.session().unwrap().image.as_str(), "second.jpg");
        assert!(!controller.is_playing());
        assert_eq!(tracker.loads(), 0);
        assert_eq!(tracker.live(), 0);
    }

    #[tokio::test]
    async fn stale_analysis_failure_is_silent() {
        let gate = Arc::new(Notify::new());
        let h = harness_with(
            Arc::new(GatedAnalysis::err(&gate, RemoteError::Timeout)),
            MockSpeechClient::ok(vec![1]),
            Arc::new(MemoryStorage::new()),
        );
        h.controller.select_image("first.jpg", None).unwrap();

        let (outcome, _) = tokio::join!(h.controller.submit(), async {
            h.controller.select_image("second.jpg", None).unwrap();
            gate.notify_one();
        });

        assert!(outcome.is_ok());
        let state = h.controller.state();
        assert_eq!(state.status(), SessionStatus::ImageSelected);
        assert_eq!(state.error(), None);
        assert_eq!(state.session().unwrap().image.as_str(), "second.jpg");
    }

    #[tokio::test]
    async fn stale_image_read_failure_is_silent() {
        let gate = Arc::new(Notify::new());
        let analysis = Arc::new(MockAnalysisClient::ok("unused"));
        let (controller, _tracker) = controller_with(
            analysis.clone(),
            Arc::new(MockSpeechClient::ok(vec![1])),
            Arc::new(GatedImages { gate: gate.clone() }),
        );
        controller.select_image("first.jpg", None).unwrap();

        let (outcome, _) = tokio::join!(controller.submit(), async {
            controller.select_image("second.jpg", None).unwrap();
            gate.notify_one();
        });

        assert!(outcome.is_ok());
        let state = controller.state();
        assert_eq!(state.status(), SessionStatus::ImageSelected);
        assert_eq!(state.session().unwrap().image.as_str(), "second.jpg");
        assert!(analysis.calls().is_empty());
    }

    #[tokio::test]
    async fn reselecting_releases_playback() {
        let h = harness(MockAnalysisClient::ok("Tires look fine."));
        h.controller.select_image("a.jpg", None).unwrap();
        h.controller.submit().await.unwrap();
        assert_eq!(h.tracker.live(), 1);

        let before = h.controller.generation();
        let after = h.controller.select_image("b.jpg", None).unwrap();
        assert!(after > before);
        assert_eq!(h.tracker.live(), 0);
        assert!(!h.controller.is_playing());
        assert_eq!(h.controller.status(), SessionStatus::ImageSelected);
    }

    #[tokio::test]
    async fn reset_from_image_selected_is_idle() {
        let h = harness(MockAnalysisClient::ok("x"));
        h.controller.select_image("a.jpg", None).unwrap();
        h.controller.reset();

        assert_eq!(h.controller.state(), SessionState::Idle);
        assert_eq!(h.tracker.live(), 0);
    }

    #[tokio::test]
    async fn save_report_persists_narration() {
        let mut h = harness(MockAnalysisClient::ok("**Alternator** belt is cracked."));
        h.controller.select_image("belt.jpg", None).unwrap();
        h.controller.submit().await.unwrap();
        drain(&mut h.events);

        let report = h.controller.save_report().await.unwrap();
        assert_eq!(report.content, "Alternator belt is cracked.");

        let listed = h.store.list().await.unwrap();
        assert_eq!(listed, vec![report.clone()]);
        assert_eq!(drain(&mut h.events), vec![SessionEvent::ReportSaved(report)]);
        assert_eq!(h.controller.status(), SessionStatus::Ready);
    }

    #[tokio::test]
    async fn save_report_outside_ready_is_rejected() {
        let h = harness(MockAnalysisClient::err(RemoteError::Timeout));
        assert!(matches!(
            h.controller.save_report().await,
            Err(SessionError::InvalidState { .. })
        ));

        h.controller.select_image("dash.jpg", None).unwrap();
        let _ = h.controller.submit().await;
        assert!(matches!(
            h.controller.save_report().await,
            Err(SessionError::InvalidState {
                status: SessionStatus::Failed,
                ..
            })
        ));
        assert!(h.store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn storage_failure_surfaces_notice_and_keeps_state() {
        let mut h = harness_with(
            Arc::new(MockAnalysisClient::ok("Battery terminals corroded.")),
            MockSpeechClient::ok(vec![1]),
            Arc::new(BrokenStorage),
        );
        h.controller.select_image("battery.jpg", None).unwrap();
        h.controller.submit().await.unwrap();
        drain(&mut h.events);

        let err = h.controller.save_report().await.unwrap_err();
        assert!(matches!(err, SessionError::Persistence(_)));
        assert_eq!(h.controller.status(), SessionStatus::Ready);

        let events = drain(&mut h.events);
        assert!(matches!(events.as_slice(), [SessionEvent::Notice(msg)] if msg.contains("read-only")));
    }

    #[tokio::test]
    async fn toggle_playback_and_natural_finish() {
        let mut h = harness(MockAnalysisClient::ok("Wiper blades streaking."));
        h.controller.select_image("wipers.jpg", None).unwrap();
        h.controller.submit().await.unwrap();
        drain(&mut h.events);

        assert!(!h.controller.toggle_playback().unwrap());
        assert!(!h.tracker.output_playing());
        assert!(h.controller.toggle_playback().unwrap());
        assert!(h.tracker.output_playing());

        h.tracker.finish();
        assert!(!h.controller.is_playing());
        assert_eq!(drain(&mut h.events), vec![SessionEvent::PlaybackFinished]);

        // Finished audio does not restart.
        assert!(!h.controller.toggle_playback().unwrap());
        assert_eq!(h.controller.status(), SessionStatus::Ready);
    }

    #[tokio::test]
    async fn toggle_playback_requires_ready() {
        let h = harness(MockAnalysisClient::ok("x"));
        assert!(matches!(
            h.controller.toggle_playback(),
            Err(SessionError::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn intermittent_narration_emits_document_advisory() {
        let mut h = harness(MockAnalysisClient::ok(
            "The misfire is intermittent and its cause is unknown.",
        ));
        h.controller.select_image("engine.jpg", None).unwrap();
        h.controller.submit().await.unwrap();

        let advisories: Vec<Advisory> = drain(&mut h.events)
            .into_iter()
            .filter_map(|e| match e {
                SessionEvent::Advisory(a) => Some(a),
                _ => None,
            })
            .collect();
        assert_eq!(advisories, vec![Advisory::DocumentSymptom]);
    }
}
