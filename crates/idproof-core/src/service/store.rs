//! In-memory session store with expiry.
//!
//! Sessions live in a keyed map behind a mutex. Each entry carries its own
//! mutex so stages on one session are serialized without blocking others.
//! A session past its timeout is treated exactly like a missing one and is
//! evicted on sight.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::domain::{
    DocumentStage, SessionId, VerificationError, VerificationResult, VerificationSession,
};
use crate::ports::Clock;

/// Session lifetime configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Time after creation at which a session expires.
    pub timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::hours(1),
        }
    }
}

/// A stored session. The creation time is kept outside the session lock so
/// sweeps can test expiry without waiting on running stages.
struct SessionEntry {
    created_at: OffsetDateTime,
    state: Mutex<VerificationSession>,
}

impl SessionEntry {
    fn is_expired_at(&self, now: OffsetDateTime, timeout: Duration) -> bool {
        now - self.created_at >= timeout
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VerificationSession> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

type Entry = Arc<SessionEntry>;

/// Keyed session store with an injected clock.
pub struct SessionStore {
    sessions: Mutex<HashMap<SessionId, Entry>>,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
}

impl SessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new(config: SessionConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            clock,
            config,
        }
    }

    /// Session timeout in use.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.config.timeout
    }

    /// Current time according to the injected clock.
    #[must_use]
    pub fn now(&self) -> OffsetDateTime {
        self.clock.now()
    }

    /// Creates a session and returns its id.
    pub fn create_session(&self) -> SessionId {
        let id = SessionId::generate();
        let created_at = self.clock.now();
        let entry = SessionEntry {
            created_at,
            state: Mutex::new(VerificationSession::new(id, created_at)),
        };
        self.map().insert(id, Arc::new(entry));
        debug!("Created session {id}");
        id
    }

    /// Returns a copy of a live session.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::SessionNotFound`] if the id is unknown or
    /// the session has expired.
    pub fn get(&self, id: SessionId) -> Result<VerificationSession, VerificationError> {
        self.update(id, |session| Ok(session.clone()))
    }

    /// Runs `f` with exclusive access to a live session.
    ///
    /// The map lock is released before `f` runs, so slow stages on one
    /// session do not block lookups of others.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::SessionNotFound`] for unknown or expired
    /// sessions, or whatever `f` returns.
    pub fn update<R>(
        &self,
        id: SessionId,
        f: impl FnOnce(&mut VerificationSession) -> Result<R, VerificationError>,
    ) -> Result<R, VerificationError> {
        let entry = self
            .map()
            .get(&id)
            .cloned()
            .ok_or(VerificationError::SessionNotFound)?;

        if entry.is_expired_at(self.clock.now(), self.config.timeout) {
            self.evict(id, &entry);
            return Err(VerificationError::SessionNotFound);
        }

        let mut session = entry.lock();

        // Evicted by a sweep while we waited for the lock.
        if !self.is_current(id, &entry) {
            return Err(VerificationError::SessionNotFound);
        }
        // Or expired while an earlier stage held it.
        if entry.is_expired_at(self.clock.now(), self.config.timeout) {
            drop(session);
            self.evict(id, &entry);
            return Err(VerificationError::SessionNotFound);
        }

        f(&mut session)
    }

    /// Records the document stage of a session.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::SessionNotFound`] or
    /// [`VerificationError::StageConflict`].
    pub fn record_document_stage(
        &self,
        id: SessionId,
        stage: DocumentStage,
    ) -> Result<(), VerificationError> {
        self.update(id, |session| session.record_document_stage(stage))
    }

    /// Records the final verdict of a session.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::SessionNotFound`] or
    /// [`VerificationError::StageConflict`].
    pub fn record_selfie_stage(
        &self,
        id: SessionId,
        result: VerificationResult,
    ) -> Result<(), VerificationError> {
        self.update(id, |session| session.record_selfie_stage(result))
    }

    /// Removes a session regardless of expiry.
    pub fn remove(&self, id: SessionId) -> Option<VerificationSession> {
        let entry = self.map().remove(&id)?;
        let session = entry.lock().clone();
        Some(session)
    }

    /// Removes every expired session and returns them.
    ///
    /// Sessions are unlinked under the map lock first, then each one is
    /// locked so a stage still running on it finishes before it is returned.
    pub fn sweep_expired(&self) -> Vec<VerificationSession> {
        let now = self.clock.now();
        let timeout = self.config.timeout;

        let removed: Vec<Entry> = {
            let mut map = self.map();
            let expired: Vec<SessionId> = map
                .iter()
                .filter(|(_, entry)| entry.is_expired_at(now, timeout))
                .map(|(id, _)| *id)
                .collect();
            expired.iter().filter_map(|id| map.remove(id)).collect()
        };

        let sessions: Vec<VerificationSession> = removed
            .iter()
            .map(|entry| entry.lock().clone())
            .collect();

        if !sessions.is_empty() {
            debug!("Swept {} expired session(s)", sessions.len());
        }
        sessions
    }

    /// Number of stored sessions, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map().len()
    }

    /// Whether the store holds no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }

    fn map(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, Entry>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, id: SessionId, entry: &Entry) -> bool {
        self.map().get(&id).is_some_and(|e| Arc::ptr_eq(e, entry))
    }

    fn evict(&self, id: SessionId, entry: &Entry) {
        let mut map = self.map();
        if map.get(&id).is_some_and(|e| Arc::ptr_eq(e, entry)) {
            map.remove(&id);
            debug!("Evicted expired session {id}");
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("sessions", &self.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
