use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use uuid::Uuid;

use crate::intake::session::{IntakeError, IntakePhase, IntakeSession};

struct Entry {
    session: IntakeSession,
    touched: Instant,
}

/// In-memory sessions keyed by id. Nothing outlives the process.
///
/// Every mutation runs inside one write-lock critical section, so a closure
/// observes and changes a session atomically. Never hold the lock across I/O.
/// Inserts and updates count as activity for [`SessionStore::evict_idle`].
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Entry>>>,
}

impl SessionStore {
    pub async fn insert(&self, session: IntakeSession) {
        let entry = Entry {
            touched: Instant::now(),
            session,
        };
        self.sessions.write().await.insert(entry.session.id, entry);
    }

    pub async fn read<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&IntakeSession) -> T,
    ) -> Result<T, IntakeError> {
        let sessions = self.sessions.read().await;
        let entry = sessions.get(&id).ok_or(IntakeError::SessionNotFound(id))?;
        Ok(f(&entry.session))
    }

    pub async fn update<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut IntakeSession) -> Result<T, IntakeError>,
    ) -> Result<T, IntakeError> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .get_mut(&id)
            .ok_or(IntakeError::SessionNotFound(id))?;
        entry.touched = Instant::now();
        f(&mut entry.session)
    }

    /// Removes the session if `check` allows it.
    pub async fn remove_if(
        &self,
        id: Uuid,
        check: impl FnOnce(&IntakeSession) -> Result<(), IntakeError>,
    ) -> Result<IntakeSession, IntakeError> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get(&id).ok_or(IntakeError::SessionNotFound(id))?;
        check(&entry.session)?;
        sessions
            .remove(&id)
            .map(|entry| entry.session)
            .ok_or(IntakeError::SessionNotFound(id))
    }

    /// Drops sessions untouched for at least `max_idle` and returns how many
    /// went. A session waiting on the backend is kept until its write-back lands.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| {
            entry.session.phase == IntakePhase::Submitting || entry.touched.elapsed() < max_idle
        });
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
