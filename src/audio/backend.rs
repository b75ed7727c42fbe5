//! Output backend traits and the playback error type.
//!
//! [`PlaybackBackend`] decodes bytes into a [`LoadedAudio`]; the manager is
//! the only caller. [`FakePlaybackBackend`] (test-only) counts live resources
//! and lets tests trigger end-of-playback by hand.

use thiserror::Error;

/// One-shot notification fired when playback reaches the end.
pub type CompletionCallback = Box<dyn FnOnce() + Send + 'static>;

// ---------------------------------------------------------------------------
// PlaybackError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlaybackError {
    /// The handle does not refer to the currently loaded resource.
    #[error("stale or unknown playback handle")]
    InvalidHandle,

    /// No output device / stream could be opened.
    #[error("audio output unavailable: {0}")]
    Output(String),

    /// The audio bytes could not be decoded.
    #[error("cannot decode audio: {0}")]
    Decode(String),
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Turns encoded audio into a playable resource.
pub trait PlaybackBackend: Send {
    /// Decode `audio` and return a paused resource.
    fn load(&mut self, audio: Vec<u8>) -> Result<Box<dyn LoadedAudio>, PlaybackError>;
}

impl<B: PlaybackBackend + ?Sized> PlaybackBackend for Box<B> {
    fn load(&mut self, audio: Vec<u8>) -> Result<Box<dyn LoadedAudio>, PlaybackError> {
        (**self).load(audio)
    }
}

/// A decoded, loaded audio resource.
///
/// After [`unload`](Self::unload) the completion callback must never fire.
pub trait LoadedAudio: Send {
    fn play(&self);
    fn pause(&self);
    fn unload(&self);
    /// Arrange for `on_end` to run once when playback drains naturally.
    fn watch_completion(&self, on_end: CompletionCallback);
}

// ---------------------------------------------------------------------------
// FakePlaybackBackend  (test-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
#[cfg(test)]
use std::sync::{Arc, Mutex};

/// In-memory backend. Empty byte buffers fail to "decode".
#[cfg(test)]
pub struct FakePlaybackBackend {
    tracker: PlaybackTracker,
}

/// Observation side of [`FakePlaybackBackend`], cloneable into tests.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct PlaybackTracker {
    live: Arc<AtomicUsize>,
    loads: Arc<AtomicUsize>,
    playing: Arc<AtomicBool>,
    finisher: Arc<Mutex<Option<CompletionCallback>>>,
}

#[cfg(test)]
impl FakePlaybackBackend {
    pub fn new() -> (Self, PlaybackTracker) {
        let tracker = PlaybackTracker::default();
        (
            Self {
                tracker: tracker.clone(),
            },
            tracker,
        )
    }
}

#[cfg(test)]
impl PlaybackTracker {
    /// Resources loaded and not yet unloaded.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Total successful loads.
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Whether the most recent resource was last told to play.
    pub fn output_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    /// Simulate the most recent resource reaching its end.
    pub fn finish(&self) {
        let cb = self.finisher.lock().unwrap().take();
        if let Some(cb) = cb {
            cb();
        }
    }
}

#[cfg(test)]
struct FakeAudio {
    tracker: PlaybackTracker,
    unloaded: AtomicBool,
}

#[cfg(test)]
impl PlaybackBackend for FakePlaybackBackend {
    fn load(&mut self, audio: Vec<u8>) -> Result<Box<dyn LoadedAudio>, PlaybackError> {
        if audio.is_empty() {
            return Err(PlaybackError::Decode("no audio frames".into()));
        }
        self.tracker.live.fetch_add(1, Ordering::SeqCst);
        self.tracker.loads.fetch_add(1, Ordering::SeqCst);
        self.tracker.playing.store(false, Ordering::SeqCst);
        Ok(Box::new(FakeAudio {
            tracker: self.tracker.clone(),
            unloaded: AtomicBool::new(false),
        }))
    }
}

#[cfg(test)]
impl LoadedAudio for FakeAudio {
    fn play(&self) {
        self.tracker.playing.store(true, Ordering::SeqCst);
    }

    fn pause(&self) {
        self.tracker.playing.store(false, Ordering::SeqCst);
    }

    fn unload(&self) {
        if !self.unloaded.swap(true, Ordering::SeqCst) {
            self.tracker.live.fetch_sub(1, Ordering::SeqCst);
            self.tracker.playing.store(false, Ordering::SeqCst);
            self.tracker.finisher.lock().unwrap().take();
        }
    }

    fn watch_completion(&self, on_end: CompletionCallback) {
        *self.tracker.finisher.lock().unwrap() = Some(on_end);
    }
}
