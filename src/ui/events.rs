use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind,
};
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error};

/// The closed set of things the user can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    // Tree navigation
    Up,
    Down,
    ToggleFolder,
    Enqueue,
    SwitchView,

    // Playback
    Pause,
    Skip,
    ClearQueue,
    ToggleLoop,
    VolumeUp,
    VolumeDown,

    Resize { columns: u16, rows: u16 },
    Quit,
}

pub struct EventHandler {
    event_sender: mpsc::UnboundedSender<AppEvent>,
    event_receiver: mpsc::UnboundedReceiver<AppEvent>,
}

impl EventHandler {
    pub fn new() -> Self {
        let (event_sender, event_receiver) = mpsc::unbounded_channel();

        Self {
            event_sender,
            event_receiver,
        }
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<AppEvent> {
        self.event_sender.clone()
    }

    pub async fn next_event(&mut self) -> Option<AppEvent> {
        self.event_receiver.recv().await
    }

    /// Reads the terminal on a plain thread (crossterm's read blocks) until the
    /// handler is dropped.
    pub fn spawn_input_thread(&self, scroll_input: bool) {
        let sender = self.sender();

        let spawned = thread::Builder::new()
            .name("input".to_string())
            .spawn(move || {
                while !sender.is_closed() {
                    match event::poll(Duration::from_millis(100)) {
                        Ok(true) => {}
                        Ok(false) => continue,
                        Err(e) => {
                            error!("Terminal poll failed: {}", e);
                            break;
                        }
                    }
                    let event = match event::read() {
                        Ok(event) => event,
                        Err(e) => {
                            error!("Terminal read failed: {}", e);
                            break;
                        }
                    };
                    if let Some(app_event) = map_event(event, scroll_input) {
                        if sender.send(app_event).is_err() {
                            break;
                        }
                    }
                }
                debug!("Input thread finished");
            });

        if let Err(e) = spawned {
            error!("Failed to start input thread: {}", e);
        }
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

pub fn map_event(event: Event, scroll_input: bool) -> Option<AppEvent> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => key_to_app_event(key),
        Event::Mouse(mouse) if scroll_input => mouse_to_app_event(mouse),
        Event::Resize(columns, rows) => Some(AppEvent::Resize { columns, rows }),
        _ => None,
    }
}

fn key_to_app_event(key: KeyEvent) -> Option<AppEvent> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(AppEvent::Quit),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Char('q') => Some(AppEvent::Quit),

        KeyCode::Char('k') | KeyCode::Up => Some(AppEvent::Up),
        KeyCode::Char('j') | KeyCode::Down => Some(AppEvent::Down),
        KeyCode::Char(' ') => Some(AppEvent::ToggleFolder),
        KeyCode::Enter => Some(AppEvent::Enqueue),
        KeyCode::Char('`') => Some(AppEvent::SwitchView),

        KeyCode::Char('p') => Some(AppEvent::Pause),
        KeyCode::Char('s') => Some(AppEvent::Skip),
        KeyCode::Char('c') => Some(AppEvent::ClearQueue),
        KeyCode::Char('l') => Some(AppEvent::ToggleLoop),
        KeyCode::Char('V') => Some(AppEvent::VolumeUp),
        KeyCode::Char('v') => Some(AppEvent::VolumeDown),

        _ => None,
    }
}

fn mouse_to_app_event(mouse: MouseEvent) -> Option<AppEvent> {
    match mouse.kind {
        MouseEventKind::ScrollUp => Some(AppEvent::Up),
        MouseEventKind::ScrollDown => Some(AppEvent::Down),
        _ => None,
    }
}
