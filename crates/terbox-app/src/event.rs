//! Everything the event loop reacts to, and the thread that reads the terminal.

use crossterm::event::{Event, KeyEvent, MouseEvent};
use terbox_pty::SessionId;
use tokio::sync::mpsc;

use crate::io_thread::OutputChunk;

#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize(u16, u16),
    /// Decoded output from a session's shell.
    Output { id: SessionId, chunk: OutputChunk },
    /// A session's output stream reached end of file.
    Exited { id: SessionId },
}

/// Forward terminal input events on a dedicated OS thread.
///
/// `crossterm::event::read` blocks, so it cannot run on the runtime thread.
/// The thread stops once the receiving side is gone.
pub fn start_input_thread(events: mpsc::UnboundedSender<AppEvent>) -> std::io::Result<()> {
    std::thread::Builder::new()
        .name("terminal-input".to_string())
        .spawn(move || loop {
            let event = match crossterm::event::read() {
                Ok(Event::Key(key)) => AppEvent::Key(key),
                Ok(Event::Mouse(mouse)) => AppEvent::Mouse(mouse),
                Ok(Event::Resize(cols, rows)) => AppEvent::Resize(cols, rows),
                Ok(_) => continue,
                Err(e) => {
                    log::error!("terminal input failed: {e}");
                    return;
                }
            };
            if events.send(event).is_err() {
                return;
            }
        })?;
    Ok(())
}
