use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
    time::{Duration, Instant},
};

use crate::model::QueryParams;

/// Slot holding form fields between a POST and the GET it redirects to.
pub const FORM_SLOT: &str = "form";

/// How long a stored value survives without being read.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Sessions kept at most; the least recently written are evicted first.
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// Short-lived per-session values. Reads remove what they return.
pub trait SessionStore: Send + Sync {
    fn put(&self, session_id: &str, slot: &str, value: QueryParams);

    /// Take the value out of a slot, leaving it empty.
    fn take(&self, session_id: &str, slot: &str) -> Option<QueryParams>;
}

#[derive(Debug)]
struct Session {
    written: Instant,
    slots: HashMap<String, QueryParams>,
}

/// Process-local store.
///
/// Sessions with no remaining slots are dropped, as are sessions not written
/// to within the TTL. The number of live sessions is capped.
#[derive(Debug)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    ttl: Duration,
    max_sessions: usize,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::with_limits(DEFAULT_TTL, DEFAULT_MAX_SESSIONS)
    }
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(ttl: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
            max_sessions: max_sessions.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_expired(&self, session: &Session, now: Instant) -> bool {
        now.duration_since(session.written) >= self.ttl
    }
}

impl SessionStore for MemorySessionStore {
    fn put(&self, session_id: &str, slot: &str, value: QueryParams) {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);

        sessions.retain(|_, session| !self.is_expired(session, now));

        if !sessions.contains_key(session_id) {
            while sessions.len() >= self.max_sessions {
                let oldest = sessions
                    .iter()
                    .min_by_key(|(_, session)| session.written)
                    .map(|(id, _)| id.clone());
                match oldest {
                    Some(id) => {
                        tracing::debug!(session = %id, "evicting oldest session");
                        sessions.remove(&id);
                    }
                    None => break,
                }
            }
        }

        let session = sessions.entry(session_id.to_string()).or_insert_with(|| Session {
            written: now,
            slots: HashMap::new(),
        });
        session.written = now;
        session.slots.insert(slot.to_string(), value);
    }

    fn take(&self, session_id: &str, slot: &str) -> Option<QueryParams> {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);

        if self.is_expired(sessions.get(session_id)?, now) {
            sessions.remove(session_id);
            return None;
        }

        let session = sessions.get_mut(session_id)?;
        let value = session.slots.remove(slot);
        if session.slots.is_empty() {
            sessions.remove(session_id);
        }
        value
    }
}
