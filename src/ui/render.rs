// Rendering - turns the view, the queue snapshot and playback progress into a frame
// Layout is one bordered pane, a progress line under it, and an optional debug line.

use crate::catalog::tree::EXPANDED_GLYPH;
use crate::playback::QueueSnapshot;
use crate::view::ViewPort;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use std::time::Duration;

pub const FILE_TITLE: &str = "FILE━TREE";
pub const QUEUE_TITLE: &str = "QUEUE━━━━";
pub const CURSOR: &str = "•";
pub const MIN_ROWS: u16 = 5;
pub const MIN_COLUMNS: u16 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Tree,
    Queue,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub elapsed: Duration,
    pub duration: Option<Duration>,
}

/// Everything a frame is drawn from.
pub struct RenderState<'a> {
    pub screen: Screen,
    pub view: &'a ViewPort,
    pub queue: &'a [String],
    pub progress: Option<Progress>,
    pub debug_overlay: bool,
}

pub fn is_too_small(columns: u16, rows: u16) -> bool {
    rows < MIN_ROWS || columns < MIN_COLUMNS
}

/// Rows available to the window: terminal minus the border, the progress line
/// and the debug line when it is showing.
pub fn window_rows(terminal_rows: u16, debug_overlay: bool) -> usize {
    let reserved = 3 + u16::from(debug_overlay);
    usize::from(terminal_rows.saturating_sub(reserved)).max(1)
}

/// MM:SS, with the minutes growing past two digits for long tracks.
pub fn format_time(time: Duration) -> String {
    let total = time.as_secs();
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// `━━━○---- 01:02 / 03:04`, exactly `width` characters when there is room for the bar.
pub fn progress_line(progress: Progress, width: usize) -> String {
    let elapsed = format_time(progress.elapsed);
    let total = progress
        .duration
        .map(format_time)
        .unwrap_or_else(|| "--:--".to_string());
    let times = format!(" {} / {}", elapsed, total);

    let bar_width = width.saturating_sub(times.chars().count());
    if bar_width == 0 {
        return times.trim_start().to_string();
    }

    let ratio = match progress.duration {
        Some(duration) if !duration.is_zero() => {
            (progress.elapsed.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0)
        }
        _ => 0.0,
    };
    let filled = ((ratio * bar_width as f64).floor() as usize)
        .saturating_sub(1)
        .min(bar_width - 1);
    let rest = bar_width - filled - 1;

    format!("{}○{}{}", "━".repeat(filled), "-".repeat(rest), times)
}

/// Queue names with the now-playing (and looping) marker on the first one.
pub fn queue_lines(snapshot: &QueueSnapshot) -> Vec<String> {
    snapshot
        .names
        .iter()
        .enumerate()
        .map(|(index, name)| {
            if index > 0 {
                name.clone()
            } else if snapshot.looping {
                format!("🎵 🔁 {}", name)
            } else {
                format!("🎵 {}", name)
            }
        })
        .collect()
}

pub fn debug_line(view: &ViewPort) -> String {
    let (upper, lower) = view.window();
    format!(
        "ROWS: {}, UPPER: {}, LOWER: {}, MAX: {}, LINE NUM: {}",
        view.height(),
        upper,
        lower,
        view.total(),
        view.cursor()
    )
}

fn tree_line(label: &str, selected: bool) -> Line<'_> {
    let gutter = if selected { CURSOR } else { " " };
    let mut spans = vec![Span::styled(
        format!("{} ", gutter),
        Style::default().fg(Color::Yellow),
    )];

    match label.split_once(EXPANDED_GLYPH) {
        Some((indent, rest)) => {
            spans.push(Span::raw(indent));
            spans.push(Span::styled(EXPANDED_GLYPH, Style::default().fg(Color::Green)));
            spans.push(Span::raw(rest));
        }
        None => spans.push(Span::raw(label)),
    }
    Line::from(spans)
}

pub fn draw(f: &mut Frame, state: &RenderState) {
    let area = f.area();
    if is_too_small(area.width, area.height) {
        f.render_widget(Paragraph::new("TOO SMALL!"), area);
        return;
    }

    let mut constraints = vec![Constraint::Min(3), Constraint::Length(1)];
    if state.debug_overlay {
        constraints.push(Constraint::Length(1));
    }
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    match state.screen {
        Screen::Tree => render_tree(f, chunks[0], state.view),
        Screen::Queue => render_queue(f, chunks[0], state.queue),
    }

    if let Some(progress) = state.progress {
        let line = progress_line(progress, usize::from(chunks[1].width));
        f.render_widget(Paragraph::new(line), chunks[1]);
    }

    if state.debug_overlay {
        let line = Paragraph::new(debug_line(state.view)).style(Style::default().fg(Color::DarkGray));
        f.render_widget(line, chunks[2]);
    }
}

fn pane(title: &'static str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .title_style(Style::default().add_modifier(Modifier::BOLD))
}

fn render_tree(f: &mut Frame, area: Rect, view: &ViewPort) {
    let lines: Vec<Line> = view
        .lines()
        .iter()
        .enumerate()
        .map(|(row, label)| tree_line(label, row + 1 == view.cursor()))
        .collect();

    f.render_widget(Paragraph::new(lines).block(pane(FILE_TITLE)), area);
}

fn render_queue(f: &mut Frame, area: Rect, queue: &[String]) {
    let lines: Vec<Line> = queue
        .iter()
        .enumerate()
        .map(|(index, name)| {
            if index == 0 {
                Line::styled(name.as_str(), Style::default().add_modifier(Modifier::BOLD))
            } else {
                Line::raw(format!("   {}", name))
            }
        })
        .collect();

    f.render_widget(Paragraph::new(lines).block(pane(QUEUE_TITLE)), area);
}
