//! Full-screen dashboard driven by crossterm.

use std::future::Future;
use std::io::{self, Stdout, Write};

use anyhow::{Context, Result};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    queue,
    style::Print,
    terminal::{
        self, disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use futures::StreamExt;
use tokio::sync::watch;
use tracing::debug;

use super::render::Renderer;
use crate::batch::orchestrator::RunState;

/// How the dashboard ended.
#[derive(Debug)]
pub enum DashboardExit<T> {
    /// The run finished; carries its result.
    Finished(T),
    /// The operator quit before the run finished.
    Quit,
}

/// Restores the terminal when dropped.
struct TerminalGuard {
    stdout: Stdout,
}

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode().context("Failed to enable raw mode")?;
        let mut stdout = io::stdout();
        if let Err(e) = crossterm::execute!(stdout, EnterAlternateScreen, Hide) {
            let _ = disable_raw_mode();
            return Err(e).context("Failed to enter alternate screen");
        }
        Ok(Self { stdout })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = crossterm::execute!(self.stdout, Show, LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

/// Whether `key` asks to leave the dashboard.
pub fn is_quit_key(key: &KeyEvent) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

fn draw(out: &mut impl Write, frame: &str) -> io::Result<()> {
    queue!(out, MoveTo(0, 0), Clear(ClearType::All))?;
    for (row, line) in frame.lines().enumerate() {
        let row = u16::try_from(row).unwrap_or(u16::MAX);
        queue!(out, MoveTo(0, row), Print(line))?;
    }
    out.flush()
}

/// Shows the dashboard while `run` makes progress.
///
/// The frame is redrawn on every snapshot and on resize. After an `Ok` run the
/// final frame stays up until the operator quits; an `Err` run returns at once.
pub async fn run_dashboard<F, T, E>(
    renderer: &Renderer,
    mut snapshots: watch::Receiver<RunState>,
    run: F,
) -> Result<DashboardExit<Result<T, E>>>
where
    F: Future<Output = Result<T, E>>,
{
    let mut guard = TerminalGuard::enter()?;
    let mut events = EventStream::new();
    let (mut width, _) = terminal::size().context("Failed to read terminal size")?;
    let mut finished = None;
    let mut snapshots_open = true;

    tokio::pin!(run);

    draw(&mut guard.stdout, &renderer.render(&snapshots.borrow_and_update(), width))?;

    loop {
        tokio::select! {
            result = &mut run, if finished.is_none() => {
                let failed = result.is_err();
                finished = Some(result);
                if failed {
                    break;
                }
                draw(&mut guard.stdout, &renderer.render(&snapshots.borrow(), width))?;
            }
            changed = snapshots.changed(), if snapshots_open => {
                if changed.is_err() {
                    snapshots_open = false;
                }
                draw(&mut guard.stdout, &renderer.render(&snapshots.borrow_and_update(), width))?;
            }
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) if is_quit_key(&key) => break,
                Some(Ok(Event::Resize(columns, _))) => {
                    width = columns;
                    draw(&mut guard.stdout, &renderer.render(&snapshots.borrow(), width))?;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e).context("Failed to read terminal events"),
                None => {
                    debug!("Terminal event stream closed");
                    break;
                }
            },
        }
    }

    drop(guard);
    Ok(finished.map_or(DashboardExit::Quit, DashboardExit::Finished))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn quit_keys() {
        assert!(is_quit_key(&press(KeyCode::Char('q'), KeyModifiers::NONE)));
        assert!(is_quit_key(&press(KeyCode::Esc, KeyModifiers::NONE)));
        assert!(is_quit_key(&press(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(!is_quit_key(&press(KeyCode::Char('c'), KeyModifiers::NONE)));
        assert!(!is_quit_key(&press(KeyCode::Enter, KeyModifiers::NONE)));
    }

    #[test]
    fn frames_are_drawn_line_by_line() {
        let mut out = Vec::new();
        draw(&mut out, "first\nsecond").unwrap();

        let written = String::from_utf8(out).unwrap();
        assert!(written.contains("first"));
        assert!(written.contains("second"));
        assert!(written.find("first").unwrap() < written.find("second").unwrap());
    }
}
