//! terbox-pty: shell session lifecycle and multiplexing for terbox.
//!
//! # Architecture
//!
//! - [`PtyHandle`]: Low-level process management (spawn, write, poll, kill).
//! - [`ShellSession`]: One shell process, its byte streams, and its display
//!   name / last command.
//! - [`Multiplexer`]: Owns every `ShellSession`, their tab order, and the
//!   active-session pointer.

pub mod error;
pub mod multiplexer;
pub mod pty;
pub mod session;

pub use error::MuxError;
pub use multiplexer::{Multiplexer, RegistryConfig};
pub use pty::{default_shell, PtyError, PtyHandle};
pub use session::{
    truncate_name, SessionId, SessionInfo, ShellSession, DEFAULT_SESSION_NAME, MAX_NAME_CHARS,
};
