//! Fallback backend for machines without an audio output device.
//!
//! Loads succeed for any non-empty buffer and the resource reports itself
//! finished straight away, so the session still reaches `Ready` and callers
//! waiting on completion are released.

use super::backend::{CompletionCallback, LoadedAudio, PlaybackBackend, PlaybackError};

#[derive(Debug, Default)]
pub struct SilentBackend;

impl PlaybackBackend for SilentBackend {
    fn load(&mut self, audio: Vec<u8>) -> Result<Box<dyn LoadedAudio>, PlaybackError> {
        if audio.is_empty() {
            return Err(PlaybackError::Decode("empty audio buffer".into()));
        }
        log::debug!("playback: no output device, discarding {} bytes", audio.len());
        Ok(Box::new(SilentAudio))
    }
}

struct SilentAudio;

impl LoadedAudio for SilentAudio {
    fn play(&self) {}
    fn pause(&self) {}
    fn unload(&self) {}

    fn watch_completion(&self, on_end: CompletionCallback) {
        on_end();
    }
}
