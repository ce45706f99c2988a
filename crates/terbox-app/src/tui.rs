//! Terminal setup and the event loop.

use std::io::{self, Stdout};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::cursor::{Hide, Show};
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen,
};
use terbox_db::Config;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::event::{self, AppEvent};
use crate::render;
use crate::state::{App, Flow};

/// How often exited shells are looked for.
const HOUSEKEEPING_INTERVAL: Duration = Duration::from_millis(500);

/// Raw mode on the alternate screen with mouse capture, undone on drop.
struct TerminalGuard {
    stdout: Stdout,
}

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut guard = Self { stdout: io::stdout() };
        execute!(
            guard.stdout,
            EnterAlternateScreen,
            EnableMouseCapture,
            Hide,
            Clear(ClearType::All)
        )?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(self.stdout, Show, DisableMouseCapture, LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

/// Run the UI until the quit binding is pressed.
///
/// Events are handled one at a time, each followed by a redraw.
pub async fn run(config: Config, db_path: PathBuf) -> Result<()> {
    let mut terminal = TerminalGuard::enter().context("failed to prepare terminal")?;
    let size = crossterm::terminal::size().context("failed to read terminal size")?;

    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<AppEvent>();
    event::start_input_thread(events_tx.clone()).context("failed to start input thread")?;

    let mut app = App::new(config, db_path, size, events_tx);
    app.open_tab();

    let mut housekeeping = tokio::time::interval(HOUSEKEEPING_INTERVAL);
    housekeeping.set_missed_tick_behavior(MissedTickBehavior::Skip);

    render::draw(&mut app, &mut terminal.stdout).context("failed to draw")?;
    loop {
        tokio::select! {
            Some(event) = events_rx.recv() => {
                if app.handle_event(event) == Flow::Quit {
                    break;
                }
            }
            _ = housekeeping.tick() => app.reap(),
        }
        render::draw(&mut app, &mut terminal.stdout).context("failed to draw")?;
    }

    app.shutdown();
    log::info!("terbox exiting");
    Ok(())
}
