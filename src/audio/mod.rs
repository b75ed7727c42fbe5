//! Narration playback: a single-resource audio manager over a pluggable
//! output backend.
//!
//! # Layout
//!
//! ```text
//! SessionController ──load/play/pause/release──▶ AudioPlaybackManager
//!                                                   │  (owns ≤ 1 LoadedAudio)
//!                                                   ▼
//!                                            PlaybackBackend
//!                                                   │
//!                         ┌─────────────────────────┼──────────────────────┐
//!                    RodioBackend             SilentBackend      (test) FakePlaybackBackend
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use car_doctor::audio::{AudioPlaybackManager, RodioBackend};
//!
//! let backend = RodioBackend::new().unwrap();
//! let mut playback = AudioPlaybackManager::new(backend);
//!
//! let mp3 = std::fs::read("narration.mp3").unwrap();
//! let handle = playback.load(mp3).unwrap();
//! playback.on_completion(handle, Box::new(|| println!("done"))).unwrap();
//! playback.play(handle).unwrap();
//! ```

pub mod backend;
pub mod manager;
pub mod rodio_output;
pub mod silent;

pub use backend::{CompletionCallback, LoadedAudio, PlaybackBackend, PlaybackError};
pub use manager::{AudioPlaybackManager, PlaybackHandle};
pub use rodio_output::RodioBackend;
pub use silent::SilentBackend;

#[cfg(test)]
pub use backend::{FakePlaybackBackend, PlaybackTracker};
