//! `rodio` output backend.
//!
//! `rodio::OutputStream` is `!Send` on some platforms, so it lives on a
//! dedicated thread for the lifetime of the backend. Only the `Send`
//! `OutputStreamHandle` crosses back; dropping [`RodioBackend`] closes the
//! keep-alive channel and the thread releases the device.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};

use super::backend::{CompletionCallback, LoadedAudio, PlaybackBackend, PlaybackError};

// ---------------------------------------------------------------------------
// RodioBackend
// ---------------------------------------------------------------------------

/// Plays decoded MP3 through the default output device.
pub struct RodioBackend {
    stream_handle: OutputStreamHandle,
    /// Dropped with the backend; the audio thread exits when it disconnects.
    _keepalive: mpsc::Sender<()>,
}

impl RodioBackend {
    /// Open the default output device on a dedicated thread.
    pub fn new() -> Result<Self, PlaybackError> {
        let (init_tx, init_rx) = mpsc::channel::<Result<OutputStreamHandle, PlaybackError>>();
        let (keepalive_tx, keepalive_rx) = mpsc::channel::<()>();

        thread::Builder::new()
            .name("car-doctor-audio".into())
            .spawn(move || match OutputStream::try_default() {
                Ok((stream, handle)) => {
                    let _ = init_tx.send(Ok(handle));
                    // Blocks until the backend is dropped.
                    let _ = keepalive_rx.recv();
                    drop(stream);
                    log::debug!("audio output thread exiting");
                }
                Err(e) => {
                    let _ = init_tx.send(Err(PlaybackError::Output(e.to_string())));
                }
            })
            .map_err(|e| PlaybackError::Output(format!("failed to spawn audio thread: {e}")))?;

        let stream_handle = init_rx
            .recv()
            .map_err(|_| PlaybackError::Output("audio thread exited during start-up".into()))??;

        log::info!("audio playback initialised on default output device");

        Ok(Self {
            stream_handle,
            _keepalive: keepalive_tx,
        })
    }
}

impl PlaybackBackend for RodioBackend {
    fn load(&mut self, audio: Vec<u8>) -> Result<Box<dyn LoadedAudio>, PlaybackError> {
        let source =
            Decoder::new(Cursor::new(audio)).map_err(|e| PlaybackError::Decode(e.to_string()))?;

        let sink = Sink::try_new(&self.stream_handle)
            .map_err(|e| PlaybackError::Output(e.to_string()))?;
        sink.pause();
        sink.append(source);

        Ok(Box::new(RodioAudio {
            sink: Arc::new(sink),
            unloaded: Arc::new(AtomicBool::new(false)),
        }))
    }
}

// ---------------------------------------------------------------------------
// RodioAudio
// ---------------------------------------------------------------------------

struct RodioAudio {
    sink: Arc<Sink>,
    unloaded: Arc<AtomicBool>,
}

impl LoadedAudio for RodioAudio {
    fn play(&self) {
        self.sink.play();
    }

    fn pause(&self) {
        self.sink.pause();
    }

    fn unload(&self) {
        self.unloaded.store(true, Ordering::SeqCst);
        self.sink.stop();
    }

    fn watch_completion(&self, on_end: CompletionCallback) {
        let sink = Arc::clone(&self.sink);
        let unloaded = Arc::clone(&self.unloaded);

        // `sleep_until_end` returns when the queue drains or after `stop()`.
        let spawned = thread::Builder::new()
            .name("car-doctor-playback-watch".into())
            .spawn(move || {
                sink.sleep_until_end();
                if unloaded.load(Ordering::SeqCst) {
                    return;
                }
                log::debug!("playback finished naturally");
                on_end();
            });

        if let Err(e) = spawned {
            log::warn!("could not start playback watcher: {e}");
        }
    }
}
