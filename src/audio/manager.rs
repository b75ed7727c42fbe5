//! Single-resource playback manager.
//!
//! [`AudioPlaybackManager`] holds at most one loaded resource. Every
//! [`load`](AudioPlaybackManager::load) unloads the previous resource
//! *before* decoding the new one, so two native resources never coexist.
//!
//! Callers address the resource through a [`PlaybackHandle`]. Handles are
//! never reused: after a reload or release the old handle is stale and
//! `play`/`pause`/`on_completion` reject it with
//! [`PlaybackError::InvalidHandle`] without touching the current resource.

use std::sync::{Arc, Mutex, MutexGuard};

use super::backend::{CompletionCallback, LoadedAudio, PlaybackBackend, PlaybackError};

// ---------------------------------------------------------------------------
// PlaybackHandle
// ---------------------------------------------------------------------------

/// Token naming one loaded audio resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackHandle {
    id: u64,
}

impl PlaybackHandle {
    pub fn id(&self) -> u64 {
        self.id
    }
}

// ---------------------------------------------------------------------------
// Slot
// ---------------------------------------------------------------------------

#[derive(Default)]
struct SlotState {
    playing: bool,
    finished: bool,
    released: bool,
    callbacks: Vec<CompletionCallback>,
}

struct Slot {
    handle: PlaybackHandle,
    audio: Box<dyn LoadedAudio>,
    state: Arc<Mutex<SlotState>>,
}

fn lock(state: &Mutex<SlotState>) -> MutexGuard<'_, SlotState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// AudioPlaybackManager
// ---------------------------------------------------------------------------

/// Exclusive owner of the narration playback resource.
pub struct AudioPlaybackManager {
    backend: Box<dyn PlaybackBackend>,
    current: Option<Slot>,
    next_id: u64,
}

impl AudioPlaybackManager {
    pub fn new(backend: impl PlaybackBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            current: None,
            next_id: 0,
        }
    }

    /// Release any held resource, then decode `audio` into a new paused one.
    ///
    /// If decoding fails the manager is left empty.
    pub fn load(&mut self, audio: Vec<u8>) -> Result<PlaybackHandle, PlaybackError> {
        self.release_current();

        let loaded = self.backend.load(audio)?;

        self.next_id += 1;
        let handle = PlaybackHandle { id: self.next_id };
        let state = Arc::new(Mutex::new(SlotState::default()));

        let watcher_state = Arc::clone(&state);
        loaded.watch_completion(Box::new(move || {
            let callbacks = {
                let mut st = lock(&watcher_state);
                if st.released {
                    return;
                }
                st.playing = false;
                st.finished = true;
                std::mem::take(&mut st.callbacks)
            };
            for cb in callbacks {
                cb();
            }
        }));

        log::debug!("playback: loaded resource #{}", handle.id);

        self.current = Some(Slot {
            handle,
            audio: loaded,
            state,
        });
        Ok(handle)
    }

    /// Start or resume playback. Idempotent while already playing; a no-op
    /// once the resource has played to its end.
    pub fn play(&mut self, handle: PlaybackHandle) -> Result<(), PlaybackError> {
        let slot = self.slot(handle)?;
        let mut st = lock(&slot.state);
        if st.playing || st.finished {
            return Ok(());
        }
        st.playing = true;
        slot.audio.play();
        Ok(())
    }

    /// Pause playback. Idempotent while already paused.
    pub fn pause(&mut self, handle: PlaybackHandle) -> Result<(), PlaybackError> {
        let slot = self.slot(handle)?;
        let mut st = lock(&slot.state);
        if !st.playing {
            return Ok(());
        }
        st.playing = false;
        slot.audio.pause();
        Ok(())
    }

    /// Register a one-shot callback for natural end of playback.
    ///
    /// If the resource has already finished, `callback` runs immediately.
    pub fn on_completion(
        &mut self,
        handle: PlaybackHandle,
        callback: CompletionCallback,
    ) -> Result<(), PlaybackError> {
        let slot = self.slot(handle)?;
        let run_now = {
            let mut st = lock(&slot.state);
            if st.finished {
                Some(callback)
            } else {
                st.callbacks.push(callback);
                None
            }
        };
        if let Some(cb) = run_now {
            cb();
        }
        Ok(())
    }

    /// Unload the resource named by `handle`. Releasing a stale handle is a
    /// no-op.
    pub fn release(&mut self, handle: PlaybackHandle) {
        if self.current.as_ref().is_some_and(|s| s.handle == handle) {
            self.release_current();
        }
    }

    /// Unload whatever is held, if anything.
    pub fn release_current(&mut self) {
        if let Some(slot) = self.current.take() {
            {
                let mut st = lock(&slot.state);
                st.released = true;
                st.playing = false;
                st.callbacks.clear();
            }
            slot.audio.unload();
            log::debug!("playback: released resource #{}", slot.handle.id);
        }
    }

    /// `true` while `handle` is current and playing.
    pub fn is_playing(&self, handle: PlaybackHandle) -> bool {
        self.current
            .as_ref()
            .filter(|s| s.handle == handle)
            .is_some_and(|s| lock(&s.state).playing)
    }

    /// The handle of the loaded resource, if any.
    pub fn current(&self) -> Option<PlaybackHandle> {
        self.current.as_ref().map(|s| s.handle)
    }

    pub fn is_loaded(&self) -> bool {
        self.current.is_some()
    }

    fn slot(&self, handle: PlaybackHandle) -> Result<&Slot, PlaybackError> {
        match &self.current {
            Some(slot) if slot.handle == handle => Ok(slot),
            _ => {
                log::warn!("playback: rejected stale handle #{}", handle.id);
                Err(PlaybackError::InvalidHandle)
            }
        }
    }
}

impl Drop for AudioPlaybackManager {
    fn drop(&mut self) {
        self.release_current();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
