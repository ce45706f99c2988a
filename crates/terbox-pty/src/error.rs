use crate::pty::PtyError;

/// Errors from shell session and registry operations.
///
/// `NotFound`, `DuplicateId` and `NotStarted` are caller-input errors and never
/// leave the registry in a modified state. `Process` wraps a failure from the
/// OS layer.
#[derive(Debug)]
pub enum MuxError {
    /// Unknown session id, or an operation on an empty registry.
    NotFound(String),
    /// A session with this id already exists.
    DuplicateId(String),
    /// The session has not been started yet.
    NotStarted,
    /// Spawn, pipe or kill failure.
    Process(PtyError),
}

impl std::fmt::Display for MuxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MuxError::NotFound(id) if id.is_empty() => write!(f, "no sessions"),
            MuxError::NotFound(id) => write!(f, "session {id} not found"),
            MuxError::DuplicateId(id) => write!(f, "session {id} already exists"),
            MuxError::NotStarted => write!(f, "session not started"),
            MuxError::Process(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for MuxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MuxError::Process(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PtyError> for MuxError {
    fn from(err: PtyError) -> Self {
        MuxError::Process(err)
    }
}

impl From<std::io::Error> for MuxError {
    fn from(err: std::io::Error) -> Self {
        MuxError::Process(PtyError::IoError(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(MuxError::NotFound("a".into()).to_string(), "session a not found");
        assert_eq!(MuxError::NotFound(String::new()).to_string(), "no sessions");
        assert_eq!(MuxError::DuplicateId("a".into()).to_string(), "session a already exists");
        assert_eq!(MuxError::NotStarted.to_string(), "session not started");
        assert_eq!(
            MuxError::Process(PtyError::Closed).to_string(),
            "shell input is closed"
        );
    }

    #[test]
    fn test_process_error_has_source() {
        use std::error::Error;
        let err: MuxError = PtyError::Closed.into();
        assert!(err.source().is_some());
        assert!(MuxError::NotStarted.source().is_none());
    }
}
