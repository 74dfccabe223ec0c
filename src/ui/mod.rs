// Terminal UI - the tree on the left brain, the queue one keystroke away
// Built with ratatui; the terminal is put back the way we found it no matter how we exit

mod app; // event loop tying the view to the playback engine
pub mod events; // keyboard/mouse decoding
pub mod render; // frame drawing + text formatting

pub use app::{App, UiSettings};
pub use events::{AppEvent, EventHandler};

use anyhow::Result;
use crossterm::{
    cursor,
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;

pub struct TerminalManager {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    _cleanup_guard: CleanupGuard,
}

struct CleanupGuard {
    mouse_capture: bool,
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();

        let mut stdout = io::stdout();
        let _ = execute!(stdout, LeaveAlternateScreen);
        if self.mouse_capture {
            let _ = execute!(stdout, DisableMouseCapture);
        }
        let _ = execute!(stdout, cursor::Show);
    }
}

impl TerminalManager {
    /// Mouse capture is only needed for wheel scrolling; without it the
    /// terminal keeps its own text selection.
    pub fn new(mouse_capture: bool) -> Result<Self> {
        let mut stdout = io::stdout();

        enable_raw_mode()?;
        // Guard first so a failure below still restores the terminal
        let cleanup_guard = CleanupGuard { mouse_capture };
        execute!(stdout, EnterAlternateScreen, cursor::Hide)?;
        if mouse_capture {
            execute!(stdout, EnableMouseCapture)?;
        }

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        Ok(Self {
            terminal,
            _cleanup_guard: cleanup_guard,
        })
    }

    pub fn draw<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut ratatui::Frame),
    {
        self.terminal.draw(f)?;
        Ok(())
    }

    pub fn size(&self) -> Result<ratatui::layout::Rect> {
        let size = self.terminal.size()?;
        Ok(ratatui::layout::Rect::new(0, 0, size.width, size.height))
    }
}

impl Drop for TerminalManager {
    fn drop(&mut self) {
        let _ = self.terminal.clear();
        let _ = self.terminal.show_cursor();
    }
}
