use super::{SessionKey, SessionState, DEFAULT_HISTORY_CAPACITY, SESSION_LOG_TARGET};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex as TokioMutex;
use tracing::debug;

/// A session behind its own async mutex; holding the guard serializes every
/// mutation of that session.
pub type SharedSession = Arc<TokioMutex<SessionState>>;

/// Process-wide map from session key to session state. Sessions are created
/// on first use and live for the rest of the process.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionKey, SharedSession>>,
    history_capacity: usize,
    default_volume: f32,
}

impl SessionRegistry {
    pub fn new(history_capacity: usize, default_volume: f32) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            history_capacity,
            default_volume,
        }
    }

    /// Returns the session for `key`, creating it if this is the first reference.
    pub fn get(&self, key: SessionKey) -> SharedSession {
        {
            let sessions = match self.sessions.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Some(session) = sessions.get(&key) {
                return session.clone();
            }
        }

        let mut sessions = match self.sessions.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        // Another caller may have inserted between the two locks.
        sessions
            .entry(key)
            .or_insert_with(|| {
                debug!(target: SESSION_LOG_TARGET, session = %key, "Creating session state.");
                Arc::new(TokioMutex::new(SessionState::new(
                    key,
                    self.history_capacity,
                    self.default_volume,
                )))
            })
            .clone()
    }

    /// Looks a session up without creating it.
    pub fn lookup(&self, key: SessionKey) -> Option<SharedSession> {
        let sessions = match self.sessions.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sessions.get(&key).cloned()
    }

    pub fn keys(&self) -> Vec<SessionKey> {
        let sessions = match self.sessions.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut keys: Vec<_> = sessions.keys().copied().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        match self.sessions.read() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY, 0.5)
    }
}
