//! Diagnostic session pipeline.
//!
//! This module wires the image → analysis → narration → speech → playback
//! flow and exposes the session state the presentation layer renders.
//!
//! # Architecture
//!
//! ```text
//! select_image(path, context)
//!        │
//!        ▼
//! SessionController::submit()  ← async, one in flight per session
//!        │
//!        ├─ ImageLoader::load                 → bytes
//!        ├─ AnalysisClient::analyze           → Analyzing
//!        ├─ sanitize_narration / advisories   → Analyzed
//!        ├─ SpeechClient::synthesize          → Synthesizing
//!        └─ AudioPlaybackManager::load + play → Ready
//!
//! SessionEvent (mpsc) ───▶ CLI / UI
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use car_doctor::audio::{AudioPlaybackManager, RodioBackend};
//! use car_doctor::config::{AppConfig, AppPaths};
//! use car_doctor::pipeline::{FsImageLoader, SessionController, SessionEvent};
//! use car_doctor::remote::{OpenAiAnalysisClient, OpenAiSpeechClient};
//! use car_doctor::reports::{JsonFileStorage, ReportStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let paths = AppPaths::new();
//!     let store = ReportStore::new(
//!         Arc::new(JsonFileStorage::new(&paths.reports_file)),
//!         config.reports.namespace.clone(),
//!     );
//!
//!     let (controller, mut events) = SessionController::new(
//!         Arc::new(OpenAiAnalysisClient::from_config(&config.openai, &config.analysis)),
//!         Arc::new(OpenAiSpeechClient::from_config(&config.openai, &config.speech)),
//!         Arc::new(FsImageLoader),
//!         Arc::new(store),
//!         AudioPlaybackManager::new(RodioBackend::new().unwrap()),
//!         config.speech.voice,
//!     );
//!
//!     controller.select_image("engine_bay.jpg", None).unwrap();
//!     controller.submit().await.unwrap();
//!
//!     while let Some(event) = events.recv().await {
//!         if event == SessionEvent::PlaybackFinished {
//!             break;
//!         }
//!     }
//! }
//! ```

pub mod controller;
pub mod error;
pub mod image;
pub mod narration;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use controller::SessionController;
pub use error::SessionError;
pub use image::{FsImageLoader, ImageLoader};
pub use narration::{detect_advisories, sanitize_narration, Advisory, NO_DESCRIPTION};
pub use state::{DiagnosticSession, ImageRef, SessionEvent, SessionState, SessionStatus};
