// Audio backend seam - the engine only ever talks to this trait
// Real output goes through rodio (see player.rs); tests script their own.

use std::error::Error as StdError;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("no audio output device: {0}")]
    Device(#[source] Box<dyn StdError + Send + Sync>),
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

/// How a track stopped being the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackEnd {
    Completed,
    Skipped { suppress_history: bool },
}

/// One-shot "this track is over" slot shared by the backend's completion
/// callback and the engine's skip path. The first `fire` wins, later ones are no-ops.
#[derive(Debug, Clone)]
pub struct FinishSignal {
    slot: Arc<Mutex<Option<oneshot::Sender<TrackEnd>>>>,
}

impl FinishSignal {
    pub fn new() -> (Self, oneshot::Receiver<TrackEnd>) {
        let (sender, receiver) = oneshot::channel();
        let signal = Self {
            slot: Arc::new(Mutex::new(Some(sender))),
        };
        (signal, receiver)
    }

    /// Returns `true` when this call delivered the end.
    pub fn fire(&self, end: TrackEnd) -> bool {
        let sender = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match sender {
            Some(sender) => {
                // Receiver may already be gone during shutdown; the slot is spent either way
                let _ = sender.send(end);
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    pub fn is_spent(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

/// Opaque audio output. A handle is one opened track; once `open` succeeds the
/// backend must eventually fire `finished` with [`TrackEnd::Completed`] unless
/// the track is stopped first.
pub trait AudioBackend {
    type Handle;

    fn open(&mut self, path: &Path, finished: FinishSignal) -> Result<Self::Handle, BackendError>;
    fn play(&mut self, handle: &Self::Handle);
    fn pause(&mut self, handle: &Self::Handle);
    fn stop(&mut self, handle: &Self::Handle);
    fn position(&self, handle: &Self::Handle) -> Duration;
    fn duration(&self, handle: &Self::Handle) -> Option<Duration>;
    fn set_volume(&mut self, handle: &Self::Handle, level: f32);
}
