use super::render::{self, is_too_small, window_rows, Progress, RenderState, Screen};
use super::{AppEvent, EventHandler, TerminalManager};
use crate::catalog::TrackTree;
use crate::playback::{PlaybackEngine, PlayerUpdate};
use crate::view::{Redraw, ViewPort};
use anyhow::{anyhow, Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct UiSettings {
    pub scroll_input: bool,
    pub debug_overlay: bool,
    pub volume_step: f32,
    pub fail_on_write_error: bool,
}

pub struct App {
    terminal: TerminalManager,
    event_handler: EventHandler,
    engine: PlaybackEngine,
    updates: mpsc::UnboundedReceiver<PlayerUpdate>,
    settings: UiSettings,

    // State
    tree: TrackTree,
    view: ViewPort,
    screen: Screen,
    queue: Vec<String>,
    progress: Option<Progress>,
    too_small: bool,
    dirty: bool,
    should_quit: bool,
}

impl App {
    pub fn new(
        tree: TrackTree,
        engine: PlaybackEngine,
        updates: mpsc::UnboundedReceiver<PlayerUpdate>,
        settings: UiSettings,
    ) -> Result<Self> {
        let terminal = TerminalManager::new(settings.scroll_input)?;
        let size = terminal.size()?;
        let view = ViewPort::new(&tree, window_rows(size.height, settings.debug_overlay));

        let event_handler = EventHandler::new();
        event_handler.spawn_input_thread(settings.scroll_input);

        Ok(Self {
            terminal,
            event_handler,
            engine,
            updates,
            settings,
            tree,
            view,
            screen: Screen::Tree,
            queue: Vec::new(),
            progress: None,
            too_small: is_too_small(size.width, size.height),
            dirty: true,
            should_quit: false,
        })
    }

    pub async fn run(mut self) -> Result<()> {
        info!(nodes = self.view.total(), "UI started");

        while !self.should_quit {
            if self.dirty {
                self.render()?;
                self.dirty = false;
            }

            tokio::select! {
                event = self.event_handler.next_event() => match event {
                    Some(event) => self.handle_event(event).await?,
                    None => break,
                },
                update = self.updates.recv() => match update {
                    Some(update) => self.handle_update(update).await?,
                    None => {
                        warn!("Playback updates closed, leaving");
                        break;
                    }
                },
            }
        }

        info!("UI stopped");
        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        let state = RenderState {
            screen: self.screen,
            view: &self.view,
            queue: &self.queue,
            progress: self.progress,
            debug_overlay: self.settings.debug_overlay,
        };
        self.terminal.draw(|f| render::draw(f, &state))
    }

    fn mark(&mut self, redraw: Redraw) {
        if redraw != Redraw::None {
            self.dirty = true;
        }
    }

    async fn handle_event(&mut self, event: AppEvent) -> Result<()> {
        match event {
            AppEvent::Quit => {
                self.should_quit = true;
            }
            AppEvent::Resize { columns, rows } => {
                self.resize(columns, rows).await?;
            }
            // Nothing but quit and resize gets through while the screen is too small
            _ if self.too_small => {}
            AppEvent::SwitchView => {
                self.screen = match self.screen {
                    Screen::Tree => Screen::Queue,
                    Screen::Queue => Screen::Tree,
                };
                if self.screen == Screen::Queue {
                    self.refresh_queue().await?;
                }
                self.dirty = true;
            }
            AppEvent::Pause => self.engine.pause(),
            AppEvent::Skip => self.engine.skip(),
            AppEvent::ClearQueue => self.engine.clear_queue(),
            AppEvent::ToggleLoop => self.engine.toggle_loop(),
            AppEvent::VolumeUp => self.engine.adjust_volume(self.settings.volume_step),
            AppEvent::VolumeDown => self.engine.adjust_volume(-self.settings.volume_step),

            // The rest only makes sense on the tree
            _ if self.screen == Screen::Queue => {}
            AppEvent::Up => {
                let redraw = self.view.scroll_up(&self.tree);
                self.mark(redraw);
            }
            AppEvent::Down => {
                let redraw = self.view.scroll_down(&self.tree);
                self.mark(redraw);
            }
            AppEvent::ToggleFolder => {
                let redraw = self.view.toggle_folder(&mut self.tree);
                self.mark(redraw);
            }
            AppEvent::Enqueue => {
                let tracks = self.view.enqueue_selection(&mut self.tree);
                debug!(count = tracks.len(), "Enqueue from tree");
                if !tracks.is_empty() {
                    self.engine.enqueue(tracks);
                }
                self.dirty = true;
            }
        }

        Ok(())
    }

    async fn handle_update(&mut self, update: PlayerUpdate) -> Result<()> {
        match update {
            PlayerUpdate::QueueChanged => {
                if self.screen == Screen::Queue {
                    self.refresh_queue().await?;
                    self.dirty = true;
                }
            }
            PlayerUpdate::Progress { elapsed, duration } => {
                self.progress = Some(Progress { elapsed, duration });
                self.dirty = true;
            }
            PlayerUpdate::Idle => {
                self.progress = None;
                self.dirty = true;
            }
            PlayerUpdate::HistoryFailed(message) => {
                if self.settings.fail_on_write_error {
                    return Err(anyhow!("Failed to record play history: {}", message));
                }
                warn!("Play history not recorded: {}", message);
            }
        }

        Ok(())
    }

    async fn resize(&mut self, columns: u16, rows: u16) -> Result<()> {
        self.too_small = is_too_small(columns, rows);
        self.dirty = true;
        if self.too_small {
            debug!(columns, rows, "Terminal too small");
            return Ok(());
        }

        self.view
            .resize(&self.tree, window_rows(rows, self.settings.debug_overlay));
        if self.screen == Screen::Queue {
            self.refresh_queue().await?;
        }
        Ok(())
    }

    async fn refresh_queue(&mut self) -> Result<()> {
        let snapshot = self
            .engine
            .snapshot()
            .await
            .context("Playback engine stopped answering")?;
        self.queue = render::queue_lines(&snapshot);
        Ok(())
    }
}
