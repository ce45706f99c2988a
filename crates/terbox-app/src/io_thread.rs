//! Per-session output reader.
//!
//! PTY reads block, so each session gets its own OS thread. The reader is
//! owned by the thread directly and never sits behind the registry lock.

use std::io::{ErrorKind, Read};

use terbox_pty::SessionId;
use tokio::sync::mpsc;

use crate::event::AppEvent;

const READ_BUF_SIZE: usize = 8192;
const TAB_STOP: usize = 8;

/// Plain text produced by one read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputChunk {
    /// Lines completed by this read.
    pub lines: Vec<String>,
    /// The unterminated line after the last newline, e.g. a prompt.
    pub partial: String,
}

impl OutputChunk {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.partial.is_empty()
    }
}

/// Turns raw shell bytes into plain text lines.
///
/// Invalid UTF-8 becomes U+FFFD; a multi-byte character split across reads is
/// held back until the rest arrives. Control characters are dropped, except
/// tabs, which expand to spaces.
#[derive(Debug, Default)]
pub struct LineSplitter {
    utf8_tail: Vec<u8>,
    current: String,
}

impl LineSplitter {
    pub fn feed(&mut self, bytes: &[u8]) -> OutputChunk {
        let mut data = std::mem::take(&mut self.utf8_tail);
        data.extend_from_slice(bytes);
        let text = decode(&data, &mut self.utf8_tail);

        let mut lines = Vec::new();
        for ch in text.chars() {
            match ch {
                '\n' => lines.push(std::mem::take(&mut self.current)),
                '\t' => {
                    let col = self.current.chars().count();
                    let pad = TAB_STOP - col % TAB_STOP;
                    self.current.extend(std::iter::repeat(' ').take(pad));
                }
                c if c.is_control() => {}
                c => self.current.push(c),
            }
        }
        OutputChunk {
            lines,
            partial: self.current.clone(),
        }
    }

    /// Flush whatever is buffered once the stream has ended.
    pub fn finish(&mut self) -> OutputChunk {
        if !self.utf8_tail.is_empty() {
            self.utf8_tail.clear();
            self.current.push(char::REPLACEMENT_CHARACTER);
        }
        let mut lines = Vec::new();
        if !self.current.is_empty() {
            lines.push(std::mem::take(&mut self.current));
        }
        OutputChunk {
            lines,
            partial: String::new(),
        }
    }
}

fn decode(data: &[u8], tail: &mut Vec<u8>) -> String {
    let mut out = String::with_capacity(data.len());
    let mut rest = data;
    loop {
        match std::str::from_utf8(rest) {
            Ok(s) => {
                out.push_str(s);
                return out;
            }
            Err(e) => {
                let (valid, after) = rest.split_at(e.valid_up_to());
                out.push_str(&String::from_utf8_lossy(valid));
                match e.error_len() {
                    Some(len) => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        rest = &after[len..];
                    }
                    None => {
                        tail.extend_from_slice(after);
                        return out;
                    }
                }
            }
        }
    }
}

/// Start the read loop for a session on a thread named `pty-io-<id>`.
///
/// Sends [`AppEvent::Output`] per read and a final [`AppEvent::Exited`] at
/// end of file. The thread also stops once the event loop has gone away.
pub fn start_io_thread(
    session_id: SessionId,
    reader: Box<dyn Read + Send>,
    events: mpsc::UnboundedSender<AppEvent>,
) -> std::io::Result<()> {
    std::thread::Builder::new()
        .name(format!("pty-io-{session_id}"))
        .spawn(move || io_loop(session_id, reader, events))?;
    Ok(())
}

fn io_loop(
    session_id: SessionId,
    mut reader: Box<dyn Read + Send>,
    events: mpsc::UnboundedSender<AppEvent>,
) {
    let mut buf = vec![0u8; READ_BUF_SIZE];
    let mut splitter = LineSplitter::default();

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            // EIO once the child side of the PTY is gone.
            Err(e) => {
                log::debug!("session {session_id}: read ended: {e}");
                break;
            }
        };
        let chunk = splitter.feed(&buf[..n]);
        let event = AppEvent::Output {
            id: session_id.clone(),
            chunk,
        };
        if events.send(event).is_err() {
            return;
        }
    }

    let chunk = splitter.finish();
    if !chunk.is_empty() {
        let _ = events.send(AppEvent::Output {
            id: session_id.clone(),
            chunk,
        });
    }
    let _ = events.send(AppEvent::Exited { id: session_id });
}
