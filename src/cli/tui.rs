//! Terminal user interface
//!
//! Renders the coordinator state with ratatui and turns key presses into
//! [`Command`]s. Keys are read on a dedicated thread and merged with the
//! application inbox in a single `select!`, so every state change still
//! happens on the event loop.

use std::io::{self, Stdout};
use std::thread;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::app::coordinator::{spawn_signal_forwarder, spawn_ticker};
use crate::app::events::{AppEvent, Command, EventReceiver};
use crate::app::models::{CatalogItem, DisplayRow};
use crate::app::queue::TaskStatus;
use crate::app::session::{Session, Setting};
use crate::app::{Coordinator, Flow, Screen};
use crate::cli::commands::await_transfer_cleanup;
use crate::errors::Result;

/// How long the key reader waits for input before checking for shutdown
const KEY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Rows moved by PageUp and PageDown
const PAGE_STEP: i32 = 10;

/// Browser columns shown side by side
const VISIBLE_COLUMNS: usize = 3;

/// Raw mode and alternate screen, restored on drop
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        stdout.execute(EnterAlternateScreen)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Err(e) = disable_raw_mode() {
            warn!("Failed to leave raw mode: {}", e);
        }
        if let Err(e) = self.terminal.backend_mut().execute(LeaveAlternateScreen) {
            warn!("Failed to leave alternate screen: {}", e);
        }
        if let Err(e) = self.terminal.show_cursor() {
            warn!("Failed to show cursor: {}", e);
        }
    }
}

/// Run the interactive browser until the user quits
pub async fn run(
    mut coordinator: Coordinator,
    mut inbox: EventReceiver,
    tick_interval: Duration,
) -> Result<()> {
    let mut guard = TerminalGuard::enter()?;

    let events = coordinator.events().clone();
    let ticker = spawn_ticker(events.clone(), tick_interval);
    let signals = spawn_signal_forwarder(events);
    let (key_tx, mut keys) = mpsc::unbounded_channel();
    spawn_key_reader(key_tx);

    let result = loop {
        if let Err(e) = guard.terminal.draw(|frame| render(frame, &coordinator)) {
            break Err(e.into());
        }

        let event = tokio::select! {
            Some(key) = keys.recv() => {
                let prompt_open = coordinator.prompt().is_some();
                match map_key(key, coordinator.screen(), prompt_open) {
                    Some(command) => AppEvent::Input(command),
                    None => continue,
                }
            }
            event = inbox.recv() => match event {
                Some(event) => event,
                None => break Ok(()),
            },
        };

        let had_transfer = coordinator
            .queue()
            .and_then(|queue| queue.active_item())
            .is_some();
        match coordinator.handle(event) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => {
                await_transfer_cleanup(&mut inbox, had_transfer).await;
                break Ok(());
            }
            Err(e) => break Err(e),
        }
    };

    ticker.abort();
    signals.abort();
    drop(keys);
    drop(guard);
    debug!("Terminal UI closed");
    result
}

/// Forward key presses from a blocking reader thread
///
/// The thread exits once the receiving side is gone.
fn spawn_key_reader(keys: mpsc::UnboundedSender<KeyEvent>) {
    thread::spawn(move || {
        while !keys.is_closed() {
            match event::poll(KEY_POLL_INTERVAL) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) => {
                        if keys.send(key).is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Failed to read terminal event: {}", e);
                        break;
                    }
                },
                Ok(false) => {}
                Err(e) => {
                    warn!("Failed to poll terminal events: {}", e);
                    break;
                }
            }
        }
    });
}

/// Translate a key press into a command for the current screen
pub fn map_key(key: KeyEvent, screen: Screen, prompt_open: bool) -> Option<Command> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && key.code == KeyCode::Char('c') {
        return Some(match (screen, prompt_open) {
            (Screen::Downloads, false) => Command::CloseDownloads,
            _ => Command::Quit,
        });
    }

    if prompt_open {
        return match key.code {
            KeyCode::Enter => Some(Command::PromptSubmit),
            KeyCode::Esc => Some(Command::PromptCancel),
            KeyCode::Backspace => Some(Command::PromptBackspace),
            KeyCode::Char(c) if !ctrl => Some(Command::PromptInput(c)),
            _ => None,
        };
    }

    let common = match key.code {
        KeyCode::Up => Some(Command::MoveCursor(-1)),
        KeyCode::Down => Some(Command::MoveCursor(1)),
        KeyCode::PageUp => Some(Command::MoveCursor(-PAGE_STEP)),
        KeyCode::PageDown => Some(Command::MoveCursor(PAGE_STEP)),
        KeyCode::Char('r') => Some(Command::DeleteDownloaded),
        KeyCode::Char('q') => Some(Command::Quit),
        _ => None,
    };
    if common.is_some() {
        return common;
    }

    match screen {
        Screen::Browser => match key.code {
            KeyCode::Left => Some(Command::MoveFocus(-1)),
            KeyCode::Right => Some(Command::MoveFocus(1)),
            KeyCode::Enter | KeyCode::Char(' ') => Some(Command::ToggleSelection),
            KeyCode::Char('d') => Some(Command::OpenDownloads),
            KeyCode::Char('k') => Some(Command::EditSetting(Setting::ApiKey)),
            KeyCode::Char('u') => Some(Command::EditSetting(Setting::UserId)),
            KeyCode::Char('e') => Some(Command::EditSetting(Setting::Endpoint)),
            KeyCode::Char('l') => Some(Command::EditSetting(Setting::DownloadLocation)),
            _ => None,
        },
        Screen::Downloads => match key.code {
            KeyCode::Enter | KeyCode::Char(' ') => Some(Command::StartOrCancel),
            KeyCode::Esc => Some(Command::CloseDownloads),
            _ => None,
        },
    }
}

fn render(frame: &mut Frame, coordinator: &Coordinator) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(frame.size());

    match coordinator.screen() {
        Screen::Browser => render_browser(frame, chunks[0], coordinator),
        Screen::Downloads => render_downloads(frame, chunks[0], coordinator),
    }
    render_status(frame, chunks[1], coordinator);
    frame.render_widget(
        Paragraph::new(hints(coordinator)).style(Style::default().fg(Color::DarkGray)),
        chunks[2],
    );
}

/// Range of columns to draw, keeping the focused one and its children in view
pub fn visible_column_range(count: usize, focused: usize, max: usize) -> std::ops::Range<usize> {
    let shown = count.min(max);
    let start = focused.saturating_sub(1).min(count - shown);
    start..start + shown
}

fn render_browser(frame: &mut Frame, area: Rect, coordinator: &Coordinator) {
    let navigator = coordinator.navigator();
    let columns = navigator.columns();

    if columns.is_empty() {
        let message = if navigator.is_loading() {
            "Loading libraries..."
        } else {
            "Nothing to show"
        };
        frame.render_widget(
            Paragraph::new(message).block(Block::default().title("Libraries").borders(Borders::ALL)),
            area,
        );
        return;
    }

    let range = visible_column_range(columns.len(), navigator.focused_column(), VISIBLE_COLUMNS);
    let constraints = vec![Constraint::Ratio(1, range.len() as u32); range.len()];
    let areas = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    for (slot, index) in range.enumerate() {
        let column = &columns[index];
        let title = if index == 0 {
            "Libraries".to_string()
        } else {
            columns[index - 1]
                .focused()
                .map(|item| item.name.clone())
                .unwrap_or_default()
        };

        let items: Vec<ListItem> = column
            .items
            .iter()
            .map(|item| ListItem::new(column_row(item, coordinator.session())))
            .collect();

        let focused = index == navigator.focused_column();
        let border_style = if focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        };
        let highlight = if focused {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };

        let list = List::new(items)
            .block(
                Block::default()
                    .title(title)
                    .borders(Borders::ALL)
                    .border_style(border_style),
            )
            .highlight_style(highlight);
        let mut state = ListState::default().with_selected(Some(column.cursor));
        frame.render_stateful_widget(list, areas[slot], &mut state);
    }
}

/// One browser row: selection box, label, downloaded marker
fn column_row(item: &CatalogItem, session: &Session) -> Line<'static> {
    let marker = if session.selection().contains(&item.id) {
        "[x] "
    } else {
        "[ ] "
    };
    let mut spans = vec![Span::raw(marker), Span::raw(item.title())];
    if item.is_folder {
        spans.push(Span::raw("/"));
    }
    if session.downloaded().contains(&item.id) {
        spans.push(Span::styled(" ✓", Style::default().fg(Color::Green)));
    }
    Line::from(spans)
}

fn render_downloads(frame: &mut Frame, area: Rect, coordinator: &Coordinator) {
    let Some(queue) = coordinator.queue() else {
        return;
    };

    let summary = queue.summary();
    let title = format!(
        "Downloads: {} done, {} failed, {} waiting",
        summary.completed, summary.failed, summary.waiting
    );
    let block = Block::default().title(title).borders(Borders::ALL);

    if !queue.is_loaded() {
        frame.render_widget(Paragraph::new("Loading download list...").block(block), area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(area);

    let items: Vec<ListItem> = queue
        .tasks()
        .iter()
        .map(|task| {
            let color = match task.status {
                TaskStatus::Completed { .. } => Color::Green,
                TaskStatus::Failed { .. } => Color::Red,
                TaskStatus::Downloading { .. } => Color::Yellow,
                TaskStatus::NotStarted => Color::Reset,
            };
            ListItem::new(vec![
                Line::from(Span::styled(task.title(), Style::default().fg(color))),
                Line::from(Span::styled(
                    format!("  {}", task.description()),
                    Style::default().fg(Color::DarkGray),
                )),
            ])
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    let mut state = ListState::default().with_selected(Some(coordinator.task_cursor()));
    frame.render_stateful_widget(list, chunks[0], &mut state);

    let (label, ratio) = match queue.active_item().and_then(|id| queue.task(id)) {
        Some(task) => (task.title(), task.ratio()),
        None => ("Idle".to_string(), 0.0),
    };
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL))
        .gauge_style(Style::default().fg(Color::Cyan))
        .ratio(ratio)
        .label(label);
    frame.render_widget(gauge, chunks[1]);
}

fn render_status(frame: &mut Frame, area: Rect, coordinator: &Coordinator) {
    let line = match coordinator.prompt() {
        Some(prompt) => Line::from(vec![
            Span::styled(
                format!("{}: ", prompt.setting.label()),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(prompt.display_value()),
            Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
        ]),
        None => {
            let navigator = coordinator.navigator();
            let text = if let Some(item) = navigator.propagating_item() {
                format!("Updating selection below {}...", item)
            } else if navigator.is_loading() && coordinator.info().is_empty() {
                "Loading...".to_string()
            } else {
                coordinator.info().to_string()
            };
            Line::from(text)
        }
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn hints(coordinator: &Coordinator) -> &'static str {
    if coordinator.prompt().is_some() {
        return "enter save  esc cancel";
    }
    match coordinator.screen() {
        Screen::Browser => {
            "←→↑↓ move  enter/space select  r delete  d downloads  k key  u user  e endpoint  l location  q quit"
        }
        Screen::Downloads => "↑↓ move  enter start/cancel  r delete  esc back  q quit",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl_c() -> KeyEvent {
        KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)
    }

    #[test]
    fn test_ctrl_c_depends_on_screen() {
        assert_eq!(map_key(ctrl_c(), Screen::Browser, false), Some(Command::Quit));
        assert_eq!(
            map_key(ctrl_c(), Screen::Downloads, false),
            Some(Command::CloseDownloads)
        );
        assert_eq!(map_key(ctrl_c(), Screen::Downloads, true), Some(Command::Quit));
    }

    #[test]
    fn test_prompt_captures_text_keys() {
        assert_eq!(
            map_key(press(KeyCode::Char('q')), Screen::Browser, true),
            Some(Command::PromptInput('q'))
        );
        assert_eq!(
            map_key(press(KeyCode::Enter), Screen::Browser, true),
            Some(Command::PromptSubmit)
        );
        assert_eq!(
            map_key(press(KeyCode::Esc), Screen::Downloads, true),
            Some(Command::PromptCancel)
        );
        assert_eq!(
            map_key(press(KeyCode::Backspace), Screen::Browser, true),
            Some(Command::PromptBackspace)
        );
        assert_eq!(map_key(press(KeyCode::Left), Screen::Browser, true), None);
    }

    #[test]
    fn test_browser_keys() {
        assert_eq!(
            map_key(press(KeyCode::Right), Screen::Browser, false),
            Some(Command::MoveFocus(1))
        );
        assert_eq!(
            map_key(press(KeyCode::Char(' ')), Screen::Browser, false),
            Some(Command::ToggleSelection)
        );
        assert_eq!(
            map_key(press(KeyCode::Enter), Screen::Browser, false),
            Some(Command::ToggleSelection)
        );
        assert_eq!(
            map_key(press(KeyCode::Char('k')), Screen::Browser, false),
            Some(Command::EditSetting(Setting::ApiKey))
        );
        assert_eq!(
            map_key(press(KeyCode::PageDown), Screen::Browser, false),
            Some(Command::MoveCursor(PAGE_STEP))
        );
    }

    #[test]
    fn test_download_keys() {
        assert_eq!(
            map_key(press(KeyCode::Enter), Screen::Downloads, false),
            Some(Command::StartOrCancel)
        );
        assert_eq!(
            map_key(press(KeyCode::Char('r')), Screen::Downloads, false),
            Some(Command::DeleteDownloaded)
        );
        assert_eq!(
            map_key(press(KeyCode::Esc), Screen::Downloads, false),
            Some(Command::CloseDownloads)
        );
        assert_eq!(map_key(press(KeyCode::Left), Screen::Downloads, false), None);
        assert_eq!(map_key(press(KeyCode::Char('d')), Screen::Downloads, false), None);
    }

    #[test]
    fn test_key_release_ignored() {
        let mut key = press(KeyCode::Char('q'));
        key.kind = KeyEventKind::Release;
        assert_eq!(map_key(key, Screen::Browser, false), None);
    }

    #[test]
    fn test_visible_column_range() {
        assert_eq!(visible_column_range(1, 0, 3), 0..1);
        assert_eq!(visible_column_range(5, 0, 3), 0..3);
        assert_eq!(visible_column_range(5, 2, 3), 1..4);
        assert_eq!(visible_column_range(5, 4, 3), 2..5);
    }
}
