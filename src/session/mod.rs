//! Opaque session tokens and their in-memory store.
//!
//! Every tool call except `start_session` must present a valid token. The
//! store has no persistence: a server restart invalidates everything, and an
//! evicted token is never resurrected.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Default session lifetime.
const SESSION_TTL_HOURS: i64 = 24;

/// Generate an opaque token: 128 bits from the thread CSPRNG, printed as hex.
#[must_use]
pub fn generate_token() -> String {
    format!("{:032x}", rand::rng().random::<u128>())
}

#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
}

impl Session {
    fn new(ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            token: generate_token(),
            created_at: now,
            expires_at: now + ttl,
            last_used_at: now,
        }
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Process-wide session table. Reads predominate, so access goes through a
/// reader/writer lock; eviction is lazy on lookup.
pub struct SessionStore {
    inner: RwLock<HashMap<String, Session>>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            ttl: Duration::hours(SESSION_TTL_HOURS),
        }
    }

    #[cfg(test)]
    fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Mint a new session.
    pub async fn create(&self) -> Session {
        let session = Session::new(self.ttl);
        let mut inner = self.inner.write().await;
        inner.insert(session.token.clone(), session.clone());
        session
    }

    /// Look up a session. An expired entry is removed and reported absent.
    pub async fn get(&self, token: &str) -> Option<Session> {
        {
            let inner = self.inner.read().await;
            match inner.get(token) {
                Some(session) if !session.is_expired() => return Some(session.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        // Expired: upgrade to a write lock and evict.
        let mut inner = self.inner.write().await;
        if inner.get(token).is_some_and(Session::is_expired) {
            inner.remove(token);
        }
        None
    }

    /// Record use of a session.
    pub async fn touch(&self, token: &str) {
        let mut inner = self.inner.write().await;
        if let Some(session) = inner.get_mut(token) {
            session.last_used_at = Utc::now();
        }
    }

    /// All live sessions, eviction applied.
    pub async fn list(&self) -> Vec<Session> {
        let mut inner = self.inner.write().await;
        inner.retain(|_, s| !s.is_expired());
        let mut sessions: Vec<Session> = inner.values().cloned().collect();
        sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        sessions
    }

    /// Remove one session. Returns whether it existed.
    pub async fn clear(&self, token: &str) -> bool {
        self.inner.write().await.remove(token).is_some()
    }

    /// Remove every session.
    pub async fn clear_all(&self) {
        self.inner.write().await.clear();
    }
}
