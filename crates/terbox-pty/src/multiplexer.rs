use std::collections::HashMap;
use std::io::Read;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::MuxError;
use crate::pty::default_shell;
use crate::session::{SessionId, SessionInfo, ShellSession};

/// Settings the registry needs at session-creation time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Shell executable spawned for every new session.
    pub shell: String,
    pub cols: u16,
    pub rows: u16,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            cols: 80,
            rows: 24,
        }
    }
}

#[derive(Default)]
struct Inner {
    sessions: HashMap<SessionId, Arc<ShellSession>>,
    /// Insertion order; defines tab order.
    order: Vec<SessionId>,
    /// `None` only while the registry is empty.
    active: Option<SessionId>,
}

impl Inner {
    /// Drop `id` from the bookkeeping and repair the active pointer.
    fn evict(&mut self, id: &str) -> Option<Arc<ShellSession>> {
        let session = self.sessions.remove(id)?;
        self.order.retain(|sid| sid != id);
        if self.active.as_deref() == Some(id) {
            self.active = self.order.first().cloned();
        }
        Some(session)
    }

    fn active_position(&self) -> Option<usize> {
        let active = self.active.as_deref()?;
        self.order.iter().position(|id| id == active)
    }

    fn rotate(&mut self, forward: bool) -> Result<SessionId, MuxError> {
        if self.order.is_empty() {
            return Err(MuxError::NotFound(String::new()));
        }
        let len = self.order.len();
        let next = match self.active_position() {
            Some(i) if forward => (i + 1) % len,
            Some(i) => (i + len - 1) % len,
            None => 0,
        };
        let id = self.order[next].clone();
        self.active = Some(id.clone());
        Ok(id)
    }

    fn session(&self, id: &str) -> Result<Arc<ShellSession>, MuxError> {
        self.sessions
            .get(id)
            .cloned()
            .ok_or_else(|| MuxError::NotFound(id.to_string()))
    }
}

/// Owns every shell session, their tab order, and the active-session pointer.
///
/// Mutations take one exclusive lock; queries share a read lock. Process
/// spawn, pipe writes and kills run outside the lock so a slow shell never
/// stalls unrelated readers. Sessions are only reachable through this API.
pub struct Multiplexer {
    inner: RwLock<Inner>,
    config: RegistryConfig,
}

impl Multiplexer {
    /// Create a new, empty multiplexer.
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            config,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Spawn a shell for `id` and register it at the end of the tab order.
    ///
    /// Fails with `DuplicateId` if `id` exists. If the shell cannot be started
    /// nothing is registered. The first session added to an empty registry
    /// becomes active.
    pub fn create_session(&self, id: &str) -> Result<SessionInfo, MuxError> {
        if self.read().sessions.contains_key(id) {
            return Err(MuxError::DuplicateId(id.to_string()));
        }

        let session = ShellSession::new(id);
        session.start(&self.config.shell, self.config.cols, self.config.rows)?;

        let mut inner = self.write();
        if inner.sessions.contains_key(id) {
            // Lost a race with another create for the same id.
            drop(inner);
            let _ = session.close();
            return Err(MuxError::DuplicateId(id.to_string()));
        }

        let info = session.info();
        inner.sessions.insert(id.to_string(), Arc::new(session));
        inner.order.push(id.to_string());
        if inner.active.is_none() {
            inner.active = Some(id.to_string());
        }
        log::info!("created session {id} ({} open)", inner.sessions.len());
        Ok(info)
    }

    /// Metadata snapshot for `id`.
    pub fn get_session(&self, id: &str) -> Result<SessionInfo, MuxError> {
        let session = self.read().session(id)?;
        Ok(session.info())
    }

    /// Like [`get_session`](Self::get_session), `None` for an unknown id.
    pub fn get_session_info(&self, id: &str) -> Option<SessionInfo> {
        self.get_session(id).ok()
    }

    /// Run `f` against the session while holding the shared lock.
    pub fn with_session<R>(
        &self,
        id: &str,
        f: impl FnOnce(&ShellSession) -> R,
    ) -> Result<R, MuxError> {
        let inner = self.read();
        let session = inner
            .sessions
            .get(id)
            .ok_or_else(|| MuxError::NotFound(id.to_string()))?;
        Ok(f(session))
    }

    /// Close and remove a session.
    ///
    /// The bookkeeping entry is removed even if the process could not be
    /// terminated; that failure is still returned.
    pub fn close_session(&self, id: &str) -> Result<(), MuxError> {
        let session = self
            .write()
            .evict(id)
            .ok_or_else(|| MuxError::NotFound(id.to_string()))?;
        session.close()
    }

    /// Snapshot of all session ids in tab order.
    pub fn list_sessions(&self) -> Vec<SessionId> {
        self.read().order.clone()
    }

    /// Metadata for all sessions in tab order.
    pub fn session_infos(&self) -> Vec<SessionInfo> {
        let sessions: Vec<Arc<ShellSession>> = {
            let inner = self.read();
            inner
                .order
                .iter()
                .filter_map(|id| inner.sessions.get(id).cloned())
                .collect()
        };
        sessions.iter().map(|s| s.info()).collect()
    }

    /// Metadata for the active session.
    pub fn get_active(&self) -> Result<SessionInfo, MuxError> {
        let session = {
            let inner = self.read();
            let id = inner.active.clone().unwrap_or_default();
            inner.session(&id)?
        };
        Ok(session.info())
    }

    /// Id of the active session; `None` only when the registry is empty.
    pub fn get_active_id(&self) -> Option<SessionId> {
        self.read().active.clone()
    }

    /// Position of the active session in tab order.
    pub fn active_index(&self) -> Option<usize> {
        self.read().active_position()
    }

    /// Make `id` the active session.
    pub fn set_active(&self, id: &str) -> Result<(), MuxError> {
        let mut inner = self.write();
        if !inner.sessions.contains_key(id) {
            return Err(MuxError::NotFound(id.to_string()));
        }
        inner.active = Some(id.to_string());
        Ok(())
    }

    /// Advance the active pointer, wrapping from the last session to the first.
    pub fn next_session(&self) -> Result<SessionId, MuxError> {
        self.write().rotate(true)
    }

    /// Move the active pointer back, wrapping from the first session to the last.
    pub fn prev_session(&self) -> Result<SessionId, MuxError> {
        self.write().rotate(false)
    }

    /// Number of registered sessions.
    pub fn session_count(&self) -> usize {
        self.read().sessions.len()
    }

    /// Send a command line to session `id`.
    pub fn write_command(&self, id: &str, text: &str) -> Result<(), MuxError> {
        let session = self.read().session(id)?;
        session.write_command(text)
    }

    /// Send a command line to the active session.
    pub fn write_active(&self, text: &str) -> Result<(), MuxError> {
        let session = {
            let inner = self.read();
            let id = inner.active.clone().unwrap_or_default();
            inner.session(&id)?
        };
        session.write_command(text)
    }

    pub fn rename_session(&self, id: &str, name: &str) -> Result<(), MuxError> {
        self.with_session(id, |session| session.rename(name))
    }

    /// Hand the output stream of `id` to a background reader.
    pub fn take_output(&self, id: &str) -> Result<Option<Box<dyn Read + Send>>, MuxError> {
        self.with_session(id, |session| session.take_output())
    }

    /// Evict every session whose process has exited.
    ///
    /// Order and active pointer are updated as by [`close_session`](Self::close_session).
    /// No kill is attempted and no error is surfaced. Returns the evicted ids.
    pub fn cleanup_dead_sessions(&self) -> Vec<SessionId> {
        let mut inner = self.write();
        let dead: Vec<SessionId> = inner
            .order
            .iter()
            .filter(|id| inner.sessions.get(*id).map_or(true, |s| !s.is_alive()))
            .cloned()
            .collect();

        let evicted: Vec<Arc<ShellSession>> =
            dead.iter().filter_map(|id| inner.evict(id)).collect();
        drop(inner);

        for id in &dead {
            log::info!("reclaimed dead session {id}");
        }
        // Released outside the lock; the processes are already gone.
        drop(evicted);
        dead
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Multiplexer {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;
    use std::time::{Duration, Instant};

    fn mux() -> Multiplexer {
        Multiplexer::new(RegistryConfig {
            shell: "/bin/sh".to_string(),
            cols: 80,
            rows: 24,
        })
    }

    fn mux_with(ids: &[&str]) -> Multiplexer {
        let mux = mux();
        for id in ids {
            mux.create_session(id).unwrap();
        }
        mux
    }

    #[test]
    fn test_create_and_list_sessions() {
        let mux = mux_with(&["a", "b", "c"]);

        assert_eq!(mux.list_sessions(), vec!["a", "b", "c"]);
        assert_eq!(mux.get_active_id().as_deref(), Some("a"));
        assert_eq!(mux.session_count(), 3);
    }

    #[test]
    fn test_rotation_scenario() {
        let mux = mux_with(&["a", "b", "c"]);

        mux.next_session().unwrap();
        mux.next_session().unwrap();
        assert_eq!(mux.get_active_id().as_deref(), Some("c"));

        mux.next_session().unwrap();
        assert_eq!(mux.get_active_id().as_deref(), Some("a"));
    }

    #[test]
    fn test_prev_wraps_to_last() {
        let mux = mux_with(&["a", "b", "c"]);

        assert_eq!(mux.prev_session().unwrap(), "c");
        assert_eq!(mux.prev_session().unwrap(), "b");
        assert_eq!(mux.active_index(), Some(1));
    }

    #[test]
    fn test_next_is_cyclic() {
        let mux = mux_with(&["a", "b", "c", "d"]);
        mux.set_active("b").unwrap();

        for _ in 0..mux.session_count() {
            mux.next_session().unwrap();
        }
        assert_eq!(mux.get_active_id().as_deref(), Some("b"));
    }

    #[test]
    fn test_rotate_empty_registry() {
        let mux = mux();
        assert!(matches!(mux.next_session(), Err(MuxError::NotFound(_))));
        assert!(matches!(mux.prev_session(), Err(MuxError::NotFound(_))));
        assert!(matches!(mux.get_active(), Err(MuxError::NotFound(_))));
        assert_eq!(mux.get_active_id(), None);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mux = mux_with(&["a"]);

        assert!(matches!(mux.create_session("a"), Err(MuxError::DuplicateId(_))));
        assert_eq!(mux.list_sessions(), vec!["a"]);
        assert_eq!(mux.session_count(), 1);
    }

    #[test]
    fn test_failed_start_leaves_no_entry() {
        let mux = Multiplexer::new(RegistryConfig {
            shell: "/definitely/not/a/shell".to_string(),
            cols: 80,
            rows: 24,
        });

        assert!(matches!(mux.create_session("a"), Err(MuxError::Process(_))));
        assert!(mux.list_sessions().is_empty());
        assert_eq!(mux.session_count(), 0);
        assert_eq!(mux.get_active_id(), None);
        assert!(matches!(mux.get_session("a"), Err(MuxError::NotFound(_))));
    }

    #[test]
    fn test_get_session() {
        let mux = mux_with(&["a"]);

        let info = mux.get_session("a").unwrap();
        assert_eq!(info.id, "a");
        assert!(info.alive);
        assert!(matches!(mux.get_session("missing"), Err(MuxError::NotFound(_))));
        assert!(mux.get_session_info("missing").is_none());
    }

    #[test]
    fn test_close_active_moves_to_first_remaining() {
        let mux = mux_with(&["a", "b", "c"]);
        mux.set_active("b").unwrap();

        mux.close_session("b").unwrap();
        assert_eq!(mux.list_sessions(), vec!["a", "c"]);
        assert_eq!(mux.get_active_id().as_deref(), Some("a"));
    }

    #[test]
    fn test_close_inactive_keeps_active() {
        let mux = mux_with(&["a", "b", "c"]);
        mux.set_active("c").unwrap();

        mux.close_session("a").unwrap();
        assert_eq!(mux.get_active_id().as_deref(), Some("c"));
        assert_eq!(mux.active_index(), Some(1));
    }

    #[test]
    fn test_close_only_session_clears_active() {
        let mux = mux_with(&["a"]);

        mux.close_session("a").unwrap();
        assert_eq!(mux.get_active_id(), None);
        assert!(mux.list_sessions().is_empty());

        // A new session after emptying becomes active again.
        mux.create_session("b").unwrap();
        assert_eq!(mux.get_active_id().as_deref(), Some("b"));
    }

    #[test]
    fn test_close_nonexistent_session() {
        let mux = mux_with(&["a"]);
        assert!(matches!(mux.close_session("zzz"), Err(MuxError::NotFound(_))));
        assert_eq!(mux.session_count(), 1);
    }

    #[test]
    fn test_set_active() {
        let mux = mux_with(&["a", "b"]);

        mux.set_active("b").unwrap();
        assert_eq!(mux.get_active().unwrap().id, "b");
        assert!(matches!(mux.set_active("nope"), Err(MuxError::NotFound(_))));
        assert_eq!(mux.get_active_id().as_deref(), Some("b"));
    }

    #[test]
    fn test_list_is_a_snapshot() {
        let mux = mux_with(&["a", "b"]);
        let before = mux.list_sessions();

        mux.create_session("c").unwrap();
        mux.close_session("a").unwrap();

        assert_eq!(before, vec!["a", "b"]);
        assert_eq!(mux.list_sessions(), vec!["b", "c"]);
    }

    #[test]
    fn test_list_matches_count_through_mixed_ops() {
        let mux = mux();
        let steps: &[(&str, bool)] = &[
            ("s1", true),
            ("s2", true),
            ("s3", true),
            ("s2", false),
            ("s4", true),
            ("s1", false),
            ("s5", true),
            ("s4", false),
        ];

        for (id, create) in steps {
            if *create {
                mux.create_session(id).unwrap();
            } else {
                mux.close_session(id).unwrap();
            }
            let ids = mux.list_sessions();
            let unique: HashSet<_> = ids.iter().collect();
            assert_eq!(ids.len(), mux.session_count());
            assert_eq!(unique.len(), ids.len());
            if let Some(active) = mux.get_active_id() {
                assert!(ids.contains(&active));
            }
        }
        assert_eq!(mux.list_sessions(), vec!["s3", "s5"]);
    }

    #[test]
    fn test_write_command_round_trip() {
        let mux = mux_with(&["a", "b"]);

        mux.write_command("a", "ls").unwrap();
        assert_eq!(mux.get_session_info("a").unwrap().last_command, "ls");
        assert_eq!(mux.get_session_info("a").unwrap().name, "ls");

        mux.set_active("b").unwrap();
        mux.write_active("pwd").unwrap();
        assert_eq!(mux.get_session_info("b").unwrap().last_command, "pwd");
        assert!(matches!(mux.write_command("zzz", "ls"), Err(MuxError::NotFound(_))));
    }

    #[test]
    fn test_rename_and_infos() {
        let mux = mux_with(&["a", "b"]);
        mux.rename_session("b", "shell-2").unwrap();

        let infos = mux.session_infos();
        let names: Vec<&str> = infos.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["shell", "shell-2"]);
        assert!(matches!(mux.rename_session("x", "y"), Err(MuxError::NotFound(_))));
    }

    #[test]
    fn test_take_output() {
        let mux = mux_with(&["a"]);
        assert!(mux.take_output("a").unwrap().is_some());
        assert!(mux.take_output("a").unwrap().is_none());
        assert!(mux.take_output("b").is_err());
    }

    #[test]
    fn test_cleanup_dead_sessions() {
        let mux = mux_with(&["a", "b", "c"]);
        mux.set_active("b").unwrap();
        mux.write_command("b", "exit 0").unwrap();

        let deadline = Instant::now() + Duration::from_secs(3);
        while Instant::now() < deadline && mux.get_session("b").map(|i| i.alive).unwrap_or(false) {
            thread::sleep(Duration::from_millis(50));
        }

        let evicted = mux.cleanup_dead_sessions();
        assert_eq!(evicted, vec!["b"]);
        assert_eq!(mux.list_sessions(), vec!["a", "c"]);
        assert_eq!(mux.get_active_id().as_deref(), Some("a"));

        // Nothing left to reclaim.
        assert!(mux.cleanup_dead_sessions().is_empty());
    }

    #[test]
    fn test_concurrent_readers_during_mutation() {
        let mux = Arc::new(mux_with(&["a"]));

        let reader = {
            let mux = Arc::clone(&mux);
            thread::spawn(move || {
                for _ in 0..100 {
                    let ids = mux.list_sessions();
                    let unique: HashSet<_> = ids.iter().collect();
                    assert_eq!(unique.len(), ids.len());
                    assert!(ids.contains(&"a".to_string()));
                }
            })
        };

        for i in 0..4 {
            let id = format!("t{i}");
            mux.create_session(&id).unwrap();
            mux.next_session().unwrap();
        }
        reader.join().unwrap();
        assert_eq!(mux.session_count(), 5);
    }

    #[test]
    fn test_default_trait() {
        let mux = Multiplexer::default();
        assert!(mux.list_sessions().is_empty());
        assert!(!mux.config().shell.is_empty());
    }
}
