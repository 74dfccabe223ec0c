// Playback executor - the only code that ever touches the queue or the backend
// Commands, track ends and progress ticks are all serviced from one select loop,
// so a track that is "waiting to finish" never holds anything up.

use super::backend::{AudioBackend, FinishSignal, TrackEnd};
use super::{Command, PlaybackSettings, PlayerUpdate, QueueSnapshot, TransportState};
use crate::catalog::TrackRecord;
use crate::history::HistoryWriter;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

struct Current<H> {
    track: TrackRecord,
    handle: H,
    finished: FinishSignal,
    ended: oneshot::Receiver<TrackEnd>,
}

pub(super) struct Executor<B: AudioBackend> {
    backend: B,
    inbox: mpsc::UnboundedReceiver<Command>,
    history: HistoryWriter,
    updates: mpsc::UnboundedSender<PlayerUpdate>,
    queue: VecDeque<TrackRecord>,
    current: Option<Current<B::Handle>>,
    state: TransportState,
    volume: f32,
    looping: bool,
    progress_interval: Duration,
}

async fn wait_for_end<H>(current: &mut Option<Current<H>>) -> TrackEnd {
    match current {
        // A dropped sender means the backend let go of the track without a word
        Some(current) => (&mut current.ended).await.unwrap_or(TrackEnd::Completed),
        None => std::future::pending().await,
    }
}

impl<B: AudioBackend> Executor<B> {
    pub(super) fn new(
        backend: B,
        inbox: mpsc::UnboundedReceiver<Command>,
        history: HistoryWriter,
        updates: mpsc::UnboundedSender<PlayerUpdate>,
        settings: PlaybackSettings,
    ) -> Self {
        Self {
            backend,
            inbox,
            history,
            updates,
            queue: VecDeque::new(),
            current: None,
            state: TransportState::Idle,
            volume: settings.volume.clamp(0.0, 1.0),
            looping: false,
            progress_interval: settings.progress_interval,
        }
    }

    pub(super) async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.progress_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                end = wait_for_end(&mut self.current) => self.finish_current(end),
                command = self.inbox.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle(command),
                },
                _ = ticker.tick(), if self.current.is_some() => self.publish_progress(),
            }
        }

        if let Some(current) = self.current.take() {
            self.backend.stop(&current.handle);
        }
        debug!("Playback executor stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Enqueue(tracks) => self.enqueue(tracks),
            Command::Pause => self.toggle_pause(),
            Command::Skip => self.skip(),
            Command::ClearQueue => self.clear_queue(),
            Command::ToggleLoop => {
                self.looping = !self.looping;
                debug!(looping = self.looping, "Loop toggled");
                self.notify(PlayerUpdate::QueueChanged);
            }
            Command::AdjustVolume(delta) => self.adjust_volume(delta),
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            Command::Shutdown => {}
        }
    }

    fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            names: self.queue.iter().map(|track| track.name.clone()).collect(),
            looping: self.looping,
            state: self.state,
        }
    }

    fn enqueue(&mut self, tracks: Vec<TrackRecord>) {
        if tracks.is_empty() {
            return;
        }
        info!(count = tracks.len(), "Enqueued tracks");
        self.queue.extend(tracks);

        if self.state == TransportState::Idle {
            self.start_front();
        }
        self.notify(PlayerUpdate::QueueChanged);
    }

    // Opens the queue front, dropping entries the backend refuses until one plays or the queue is empty
    fn start_front(&mut self) {
        while let Some(track) = self.queue.front().cloned() {
            let (finished, ended) = FinishSignal::new();
            match self.backend.open(&track.path, finished.clone()) {
                Ok(handle) => {
                    self.backend.set_volume(&handle, self.volume);
                    self.backend.play(&handle);
                    info!("Now playing {}", track.name);
                    self.current = Some(Current {
                        track,
                        handle,
                        finished,
                        ended,
                    });
                    self.state = TransportState::Playing;
                    return;
                }
                Err(e) => {
                    warn!("Skipping {}: {}", track.name, e);
                    self.queue.pop_front();
                }
            }
        }

        self.state = TransportState::Idle;
        self.notify(PlayerUpdate::Idle);
    }

    fn toggle_pause(&mut self) {
        let Some(current) = &self.current else {
            return;
        };
        match self.state {
            TransportState::Playing => {
                self.backend.pause(&current.handle);
                self.state = TransportState::Paused;
            }
            TransportState::Paused => {
                self.backend.play(&current.handle);
                self.state = TransportState::Playing;
            }
            TransportState::Idle => {}
        }
    }

    fn skip(&mut self) {
        self.looping = false;
        let Some(current) = self.current.as_mut() else {
            return;
        };

        let elapsed = self.backend.position(&current.handle);
        // Without a known length there is no halfway point to have passed
        let suppress_history = match self.backend.duration(&current.handle) {
            Some(duration) => elapsed <= duration / 2,
            None => true,
        };
        self.backend.stop(&current.handle);

        let skipped = TrackEnd::Skipped { suppress_history };
        current.finished.fire(skipped);
        // Natural completion may have won the race; either way exactly one end is waiting
        let end = current.ended.try_recv().unwrap_or(skipped);
        debug!(?elapsed, ?end, "Skip requested");
        self.finish_current(end);
    }

    fn clear_queue(&mut self) {
        info!(dropped = self.queue.len(), "Cleared queue");
        self.queue.clear();

        let was_playing = self.current.is_some();
        self.skip();
        if !was_playing {
            self.state = TransportState::Idle;
            self.notify(PlayerUpdate::QueueChanged);
        }
    }

    fn finish_current(&mut self, end: TrackEnd) {
        let Some(current) = self.current.take() else {
            return;
        };

        let record = match end {
            TrackEnd::Completed => true,
            TrackEnd::Skipped { suppress_history } => !suppress_history,
        };
        if record {
            match &current.track.fingerprint {
                Some(fingerprint) => self.history.record(fingerprint),
                None => debug!("No fingerprint for {}, play not recorded", current.track.name),
            }
        }

        if !self.looping {
            self.queue.pop_front();
        }
        self.notify(PlayerUpdate::QueueChanged);
        self.start_front();
    }

    fn adjust_volume(&mut self, delta: f32) {
        self.volume = (self.volume + delta).clamp(0.0, 1.0);
        if let Some(current) = &self.current {
            self.backend.set_volume(&current.handle, self.volume);
        }
        debug!(volume = self.volume, "Volume changed");
    }

    fn publish_progress(&mut self) {
        if let Some(current) = &self.current {
            self.notify(PlayerUpdate::Progress {
                elapsed: self.backend.position(&current.handle),
                duration: self.backend.duration(&current.handle),
            });
        }
    }

    fn notify(&self, update: PlayerUpdate) {
        // The UI may already be shutting down
        let _ = self.updates.send(update);
    }
}
