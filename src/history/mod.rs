// Play history - remembers which tracks actually got listened to
// Writes happen on their own thread so the playback loop never waits on SQLite.

pub mod database;

pub use database::HistoryDatabase;

use chrono::{DateTime, Local};
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("history database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to prepare history database location: {0}")]
    Io(#[from] std::io::Error),
}

/// Where scan results and listening history end up.
pub trait PersistentStore {
    /// Registers a track; registering the same fingerprint twice is a no-op.
    fn record_file(
        &mut self,
        fingerprint: &str,
        artist: &str,
        album: &str,
        track: &str,
    ) -> Result<(), StoreError>;

    fn record_history(
        &mut self,
        fingerprint: &str,
        played_at: DateTime<Local>,
    ) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub fingerprint: String,
    pub played_at: DateTime<Local>,
}

/// Fire-and-forget handle for recording plays.
#[derive(Debug, Clone)]
pub struct HistoryWriter {
    sender: mpsc::UnboundedSender<HistoryEntry>,
}

impl HistoryWriter {
    /// Moves `store` onto a writer thread. Failed writes are handed to `on_error`;
    /// the thread keeps draining either way and exits once every writer is dropped.
    /// Hold on to the returned [`HistoryWorker`] until the writers are gone, then join it.
    pub fn spawn<S, F>(mut store: S, on_error: F) -> (Self, HistoryWorker)
    where
        S: PersistentStore + Send + 'static,
        F: Fn(StoreError) + Send + 'static,
    {
        let (sender, mut receiver) = mpsc::unbounded_channel::<HistoryEntry>();

        let handle = thread::spawn(move || {
            while let Some(entry) = receiver.blocking_recv() {
                match store.record_history(&entry.fingerprint, entry.played_at) {
                    Ok(()) => debug!(fingerprint = %entry.fingerprint, "Recorded play"),
                    Err(e) => {
                        error!(fingerprint = %entry.fingerprint, "Failed to record play: {}", e);
                        on_error(e);
                    }
                }
            }
            debug!("History writer drained");
        });

        (
            Self { sender },
            HistoryWorker {
                handle: Some(handle),
            },
        )
    }

    /// Writer whose entries land in the returned receiver instead of a store.
    pub fn detached() -> (Self, mpsc::UnboundedReceiver<HistoryEntry>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn record(&self, fingerprint: &str) {
        let entry = HistoryEntry {
            fingerprint: fingerprint.to_string(),
            played_at: Local::now(),
        };
        if self.sender.send(entry).is_err() {
            error!("History writer is gone, dropping play of {}", fingerprint);
        }
    }
}

/// Owns the writer thread. Joining (or dropping) waits for queued plays to land.
#[derive(Debug)]
pub struct HistoryWorker {
    handle: Option<JoinHandle<()>>,
}

impl HistoryWorker {
    /// Blocks until every [`HistoryWriter`] is dropped and the backlog is written.
    pub fn join(mut self) {
        self.wait();
    }

    fn wait(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("History writer thread panicked");
            }
        }
    }
}

impl Drop for HistoryWorker {
    fn drop(&mut self) {
        self.wait();
    }
}
