use std::io::{Read, Write};

use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};

/// Errors from the OS process layer.
#[derive(Debug)]
pub enum PtyError {
    SpawnFailed(String),
    IoError(std::io::Error),
    KillFailed(std::io::Error),
    /// The input stream was already closed.
    Closed,
}

impl std::fmt::Display for PtyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PtyError::SpawnFailed(msg) => write!(f, "PTY spawn failed: {msg}"),
            PtyError::IoError(err) => write!(f, "PTY I/O error: {err}"),
            PtyError::KillFailed(err) => write!(f, "failed to kill shell process: {err}"),
            PtyError::Closed => write!(f, "shell input is closed"),
        }
    }
}

impl std::error::Error for PtyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PtyError::IoError(err) | PtyError::KillFailed(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PtyError {
    fn from(err: std::io::Error) -> Self {
        PtyError::IoError(err)
    }
}

/// Owns a spawned shell: the PTY master, its byte streams, and the child process.
///
/// The reader can be handed off to a dedicated thread with [`PtyHandle::take_reader`];
/// the writer is dropped by [`PtyHandle::close_input`].
pub struct PtyHandle {
    // Held so the PTY stays open for as long as the handle lives.
    _master: Box<dyn MasterPty + Send>,
    reader: Option<Box<dyn Read + Send>>,
    writer: Option<Box<dyn Write + Send>>,
    child: Box<dyn Child + Send + Sync>,
    /// Exit status once the child has been reaped.
    exit_code: Option<u32>,
}

impl PtyHandle {
    /// Spawn `shell` on a new PTY with the caller's environment.
    ///
    /// If the output or input stream cannot be acquired after the child has
    /// been spawned, the child is killed before the error is returned.
    pub fn spawn(shell: &str, cols: u16, rows: u16) -> Result<Self, PtyError> {
        let pty_system = native_pty_system();

        let pair = pty_system
            .openpty(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| PtyError::SpawnFailed(format!("failed to open PTY: {e}")))?;

        // CommandBuilder starts from the current process environment.
        let cmd = CommandBuilder::new(shell);

        let mut child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| PtyError::SpawnFailed(format!("failed to spawn {shell}: {e}")))?;
        drop(pair.slave);

        let streams = pair
            .master
            .try_clone_reader()
            .map_err(|e| PtyError::SpawnFailed(format!("failed to clone reader: {e}")))
            .and_then(|reader| {
                pair.master
                    .take_writer()
                    .map(|writer| (reader, writer))
                    .map_err(|e| PtyError::SpawnFailed(format!("failed to take writer: {e}")))
            });

        let (reader, writer) = match streams {
            Ok(pair) => pair,
            Err(err) => {
                if let Err(kill_err) = child.kill() {
                    log::warn!("failed to kill {shell} after stream setup error: {kill_err}");
                }
                let _ = child.try_wait();
                return Err(err);
            }
        };

        log::info!("spawned {shell} (pid {:?})", child.process_id());

        Ok(Self {
            _master: pair.master,
            reader: Some(reader),
            writer: Some(writer),
            child,
            exit_code: None,
        })
    }

    /// Write bytes to the shell's input.
    pub fn write(&mut self, data: &[u8]) -> Result<(), PtyError> {
        let writer = self.writer.as_mut().ok_or(PtyError::Closed)?;
        writer.write_all(data)?;
        writer.flush()?;
        Ok(())
    }

    /// Hand the blocking output reader to the caller. Returns `None` once taken.
    pub fn take_reader(&mut self) -> Option<Box<dyn Read + Send>> {
        self.reader.take()
    }

    /// Drop the input stream. Further writes fail with [`PtyError::Closed`].
    pub fn close_input(&mut self) {
        self.writer = None;
    }

    /// Returns `true` while the input stream is open.
    pub fn has_input(&self) -> bool {
        self.writer.is_some()
    }

    /// Poll the child's exit status without blocking.
    ///
    /// Returns `None` while the process is running. A failed poll is also
    /// reported as `None`; use [`PtyHandle::has_exited`] for a liveness answer.
    pub fn try_wait(&mut self) -> Option<u32> {
        if self.exit_code.is_none() {
            if let Ok(Some(status)) = self.child.try_wait() {
                self.exit_code = Some(status.exit_code());
            }
        }
        self.exit_code
    }

    /// Returns `true` once the child has exited or can no longer be polled.
    pub fn has_exited(&mut self) -> bool {
        if self.exit_code.is_some() {
            return true;
        }
        match self.child.try_wait() {
            Ok(None) => false,
            Ok(Some(status)) => {
                self.exit_code = Some(status.exit_code());
                true
            }
            Err(_) => true,
        }
    }

    /// Forcibly terminate the child and reap it.
    ///
    /// Killing a child that has already exited is not an error. After the
    /// signal is delivered the child is waited for, so no zombie is left.
    pub fn kill(&mut self) -> Result<(), PtyError> {
        if self.try_wait().is_some() {
            return Ok(());
        }
        if let Err(err) = self.child.kill() {
            // The child may have exited between the poll and the signal.
            if self.try_wait().is_some() {
                return Ok(());
            }
            return Err(PtyError::KillFailed(err));
        }
        // Bounded: the kill escalates to SIGKILL.
        match self.child.wait() {
            Ok(status) => self.exit_code = Some(status.exit_code()),
            Err(err) => log::warn!("failed to reap killed shell: {err}"),
        }
        Ok(())
    }

    /// OS process id of the shell, if known.
    pub fn process_id(&self) -> Option<u32> {
        self.child.process_id()
    }
}

/// Returns the user's default shell, falling back to `/bin/sh`.
pub fn default_shell() -> String {
    std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string())
}
