use std::io::Read;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};
use std::time::SystemTime;

use crate::error::MuxError;
use crate::pty::{PtyError, PtyHandle};

/// Caller-supplied identifier for a shell session, unique within a registry.
pub type SessionId = String;

/// Display name of a session that has not run a command yet.
pub const DEFAULT_SESSION_NAME: &str = "shell";

/// Longest display name, in characters, derived from a command.
pub const MAX_NAME_CHARS: usize = 20;

/// Point-in-time copy of a session's metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: SessionId,
    pub name: String,
    pub last_command: String,
    pub created_at: SystemTime,
    pub alive: bool,
}

struct Metadata {
    name: String,
    last_command: String,
}

enum ProcessState {
    NotStarted,
    Running(PtyHandle),
    Closed { exit_code: Option<u32> },
}

/// One shell process plus its byte streams and metadata.
///
/// Process I/O is serialized by one mutex; name and last command live behind
/// a separate lock so readers never wait on an in-flight write for longer
/// than the metadata update itself.
///
/// Lifecycle: not started -> [`start`](Self::start) -> running ->
/// [`close`](Self::close) -> closed. A closed session cannot be restarted.
pub struct ShellSession {
    id: SessionId,
    created_at: SystemTime,
    meta: RwLock<Metadata>,
    process: Mutex<ProcessState>,
}

impl ShellSession {
    /// Create a session in the "not started" state.
    pub fn new(id: impl Into<SessionId>) -> Self {
        Self {
            id: id.into(),
            created_at: SystemTime::now(),
            meta: RwLock::new(Metadata {
                name: DEFAULT_SESSION_NAME.to_string(),
                last_command: String::new(),
            }),
            process: Mutex::new(ProcessState::NotStarted),
        }
    }

    /// Spawn `shell` and bind its input and output streams.
    ///
    /// On failure the session stays "not started" and no process is left running.
    pub fn start(&self, shell: &str, cols: u16, rows: u16) -> Result<(), MuxError> {
        let mut process = self.lock_process();
        match *process {
            ProcessState::NotStarted => {}
            ProcessState::Running(_) => {
                let msg = format!("session {} already started", self.id);
                return Err(PtyError::SpawnFailed(msg).into());
            }
            ProcessState::Closed { .. } => {
                let msg = format!("session {} is closed", self.id);
                return Err(PtyError::SpawnFailed(msg).into());
            }
        }

        let handle = PtyHandle::spawn(shell, cols, rows)?;
        *process = ProcessState::Running(handle);
        Ok(())
    }

    /// Returns the session's identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Send `text` followed by a newline to the shell.
    ///
    /// On success `text` becomes the last command and, if non-empty, its
    /// truncated form becomes the display name. Writes are serialized.
    pub fn write_command(&self, text: &str) -> Result<(), MuxError> {
        let mut process = self.lock_process();
        let handle = match &mut *process {
            ProcessState::NotStarted => return Err(MuxError::NotStarted),
            ProcessState::Closed { .. } => return Err(PtyError::Closed.into()),
            ProcessState::Running(handle) => handle,
        };

        let mut line = String::with_capacity(text.len() + 1);
        line.push_str(text);
        line.push('\n');
        handle.write(line.as_bytes())?;

        // Still under the process lock, so concurrent writers record in write order.
        let mut meta = self.meta.write().unwrap_or_else(PoisonError::into_inner);
        meta.last_command = text.to_string();
        if !text.trim().is_empty() {
            meta.name = truncate_name(text.trim(), MAX_NAME_CHARS);
        }
        Ok(())
    }

    /// Hand the output stream to a background reader. `None` if not started,
    /// closed, or already taken.
    pub fn take_output(&self) -> Option<Box<dyn Read + Send>> {
        match &mut *self.lock_process() {
            ProcessState::Running(handle) => handle.take_reader(),
            _ => None,
        }
    }

    /// Returns whether the shell process still exists.
    ///
    /// Never fails: a session that was never started, was closed, or cannot be
    /// polled is reported as not alive.
    pub fn is_alive(&self) -> bool {
        let mut process = match self.process.lock() {
            Ok(p) => p,
            Err(_) => return false,
        };
        match &mut *process {
            ProcessState::Running(handle) => !handle.has_exited(),
            _ => false,
        }
    }

    /// Exit status of the shell once it has exited.
    pub fn exit_code(&self) -> Option<u32> {
        match &mut *self.lock_process() {
            ProcessState::Running(handle) => handle.try_wait(),
            ProcessState::Closed { exit_code } => *exit_code,
            ProcessState::NotStarted => None,
        }
    }

    /// Close the input stream, then forcibly terminate the process.
    ///
    /// Idempotent: closing a closed or never-started session is a no-op.
    /// The session is closed afterwards even if the kill failed.
    pub fn close(&self) -> Result<(), MuxError> {
        let mut process = self.lock_process();
        let previous = std::mem::replace(&mut *process, ProcessState::Closed { exit_code: None });
        let mut handle = match previous {
            ProcessState::Running(handle) => handle,
            ProcessState::NotStarted => {
                *process = ProcessState::NotStarted;
                return Ok(());
            }
            closed @ ProcessState::Closed { .. } => {
                *process = closed;
                return Ok(());
            }
        };

        handle.close_input();
        let result = handle.kill();
        *process = ProcessState::Closed {
            exit_code: handle.try_wait(),
        };

        match result {
            Ok(()) => {
                log::info!("closed session {}", self.id);
                Ok(())
            }
            Err(err) => {
                log::warn!("session {}: {err}", self.id);
                Err(err.into())
            }
        }
    }

    /// Current display name.
    pub fn name(&self) -> String {
        self.meta.read().unwrap_or_else(PoisonError::into_inner).name.clone()
    }

    /// Replace the display name.
    pub fn rename(&self, name: &str) {
        self.meta.write().unwrap_or_else(PoisonError::into_inner).name = name.to_string();
    }

    /// The last command successfully written, or an empty string.
    pub fn last_command(&self) -> String {
        self.meta
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last_command
            .clone()
    }

    /// Snapshot of the session's metadata and liveness.
    pub fn info(&self) -> SessionInfo {
        let (name, last_command) = {
            let meta = self.meta.read().unwrap_or_else(PoisonError::into_inner);
            (meta.name.clone(), meta.last_command.clone())
        };
        SessionInfo {
            id: self.id.clone(),
            name,
            last_command,
            created_at: self.created_at,
            alive: self.is_alive(),
        }
    }

    fn lock_process(&self) -> MutexGuard<'_, ProcessState> {
        self.process.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ShellSession {
    fn drop(&mut self) {
        // Never leak a child process.
        let _ = self.close();
    }
}

/// Shorten `text` to at most `max_chars` characters, ending in `...` when cut.
pub fn truncate_name(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}
