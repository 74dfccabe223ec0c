// Playback engine - queue, transport state and volume behind a command channel
// The UI never touches playback state directly; it posts commands and reads snapshots.

pub mod backend;
mod engine;
pub mod player;
pub mod probe;

pub use backend::{AudioBackend, BackendError, FinishSignal, TrackEnd};
pub use player::RodioBackend;

use crate::catalog::TrackRecord;
use crate::history::HistoryWriter;
use engine::Executor;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("playback engine is no longer running")]
    Stopped,
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("failed to start playback thread: {0}")]
    Thread(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Idle,
    Playing,
    Paused,
}

/// Queue contents as they were at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueSnapshot {
    pub names: Vec<String>,
    pub looping: bool,
    pub state: TransportState,
}

/// Pushed from the engine (and the history writer) to the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerUpdate {
    QueueChanged,
    Progress {
        elapsed: Duration,
        duration: Option<Duration>,
    },
    Idle,
    HistoryFailed(String),
}

#[derive(Debug, Clone, Copy)]
pub struct PlaybackSettings {
    pub volume: f32,
    pub progress_interval: Duration,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            volume: 1.0,
            progress_interval: Duration::from_millis(500),
        }
    }
}

#[derive(Debug)]
pub(crate) enum Command {
    Enqueue(Vec<TrackRecord>),
    Pause,
    Skip,
    ClearQueue,
    ToggleLoop,
    AdjustVolume(f32),
    Snapshot(oneshot::Sender<QueueSnapshot>),
    Shutdown,
}

/// Handle to the playback executor thread. Dropping it shuts playback down.
pub struct PlaybackEngine {
    commands: mpsc::UnboundedSender<Command>,
    thread: Option<JoinHandle<()>>,
}

impl PlaybackEngine {
    /// Starts the executor thread and waits until its backend is up. `make_backend`
    /// runs on that thread, so the backend itself does not need to be `Send`.
    pub async fn spawn<B, F>(
        make_backend: F,
        history: HistoryWriter,
        updates: mpsc::UnboundedSender<PlayerUpdate>,
        settings: PlaybackSettings,
    ) -> Result<Self, EngineError>
    where
        B: AudioBackend + 'static,
        F: FnOnce() -> Result<B, BackendError> + Send + 'static,
    {
        let (commands, inbox) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel::<Result<(), EngineError>>();

        let thread = thread::Builder::new()
            .name("playback".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_time()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        let _ = ready_tx.send(Err(EngineError::Thread(e)));
                        return;
                    }
                };
                let backend = match make_backend() {
                    Ok(backend) => backend,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.into()));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));

                runtime.block_on(Executor::new(backend, inbox, history, updates, settings).run());
            })?;

        match ready_rx.await {
            Ok(Ok(())) => Ok(Self {
                commands,
                thread: Some(thread),
            }),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(EngineError::Stopped)
            }
        }
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            warn!("Playback engine is gone, command dropped");
        }
    }

    pub fn enqueue(&self, tracks: Vec<TrackRecord>) {
        self.send(Command::Enqueue(tracks));
    }

    pub fn pause(&self) {
        self.send(Command::Pause);
    }

    pub fn skip(&self) {
        self.send(Command::Skip);
    }

    pub fn clear_queue(&self) {
        self.send(Command::ClearQueue);
    }

    pub fn toggle_loop(&self) {
        self.send(Command::ToggleLoop);
    }

    pub fn adjust_volume(&self, delta: f32) {
        self.send(Command::AdjustVolume(delta));
    }

    /// Reply is produced by the executor between two commands, never mid-mutation.
    pub async fn snapshot(&self) -> Result<QueueSnapshot, EngineError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Snapshot(reply))
            .map_err(|_| EngineError::Stopped)?;
        response.await.map_err(|_| EngineError::Stopped)
    }

    /// Stops the current track and waits for the executor thread to exit.
    pub fn shutdown(mut self) {
        self.stop_thread();
    }

    fn stop_thread(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Playback thread panicked");
            }
        }
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.stop_thread();
    }
}
