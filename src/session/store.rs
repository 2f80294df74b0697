//! Server-side session storage
//!
//! Sessions are keyed by the opaque id carried in the client's cookie and
//! hold a small map of byte values. The gateway itself only reads and writes
//! the current identity; the map is open so the transport can keep its own
//! bookkeeping next to it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// How often `maybe_cleanup` is allowed to sweep, in seconds
const CLEANUP_INTERVAL_SECS: i64 = 300;

/// A single client session
#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: String,
    pub values: HashMap<String, Vec<u8>>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    fn new(session_id: String, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            values: HashMap::new(),
            created_at: now,
            expires_at: expiry_after(now, ttl),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Slide the expiry forward on activity
    fn touch(&mut self, ttl: Duration) {
        self.expires_at = expiry_after(Utc::now(), ttl);
    }
}

/// `now + ttl`, saturating at the latest representable instant
fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::TimeDelta::from_std(ttl)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// In-memory session store with expiration
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    ttl: Duration,
    last_cleanup: AtomicU64,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
            last_cleanup: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Create an empty session and return its id
    pub fn create(&self) -> String {
        self.maybe_cleanup();

        let session_id = format!("sess_{}", uuid::Uuid::new_v4().simple());
        self.sessions
            .insert(session_id.clone(), Session::new(session_id.clone(), self.ttl));
        debug!(session = %short(&session_id), "Created session");
        session_id
    }

    /// Map a presented cookie value to a live session.
    ///
    /// Returns the session id to use for this request and whether it was
    /// freshly created (the caller must then hand the id back to the client).
    pub fn resolve(&self, presented: Option<&str>) -> (String, bool) {
        if let Some(id) = presented {
            if let Some(mut session) = self.sessions.get_mut(id) {
                if !session.is_expired() {
                    session.touch(self.ttl);
                    return (id.to_string(), false);
                }
            }
            self.remove(id);
        }
        (self.create(), true)
    }

    /// Whether a live session exists under this id
    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions
            .get(session_id)
            .map(|s| !s.is_expired())
            .unwrap_or(false)
    }

    /// Read a value, or `None` if the session or key is missing or expired
    pub fn get_value(&self, session_id: &str, key: &str) -> Option<Vec<u8>> {
        let session = self.sessions.get(session_id)?;
        if session.is_expired() {
            return None;
        }
        session.values.get(key).cloned()
    }

    /// Write a value into an existing session.
    ///
    /// Returns false when the session does not exist.
    pub fn set_value(&self, session_id: &str, key: &str, value: Vec<u8>) -> bool {
        match self.sessions.get_mut(session_id) {
            Some(mut session) if !session.is_expired() => {
                session.values.insert(key.to_string(), value);
                session.touch(self.ttl);
                true
            }
            _ => false,
        }
    }

    /// Drop a value from an existing session
    pub fn remove_value(&self, session_id: &str, key: &str) -> bool {
        match self.sessions.get_mut(session_id) {
            Some(mut session) => {
                session.values.remove(key);
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, session_id: &str) {
        if self.sessions.remove(session_id).is_some() {
            debug!(session = %short(session_id), "Removed session");
        }
    }

    pub fn stats(&self) -> SessionStoreStats {
        let total = self.sessions.len();
        let expired = self.sessions.iter().filter(|s| s.is_expired()).count();

        SessionStoreStats {
            total_sessions: total,
            expired_sessions: expired,
            active_sessions: total - expired,
        }
    }

    fn maybe_cleanup(&self) {
        let now = Utc::now().timestamp().max(0) as u64;
        let last = self.last_cleanup.load(Ordering::Relaxed);

        if now.saturating_sub(last) < CLEANUP_INTERVAL_SECS as u64 {
            return;
        }

        if self
            .last_cleanup
            .compare_exchange(last, now, Ordering::SeqCst, Ordering::Relaxed)
            .is_ok()
        {
            self.cleanup();
        }
    }

    /// Remove every expired session; returns how many were dropped
    pub fn cleanup(&self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| !s.is_expired());
        let removed = before.saturating_sub(self.sessions.len());

        if removed > 0 {
            info!("Cleaned up {} expired sessions", removed);
        }
        removed
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(86_400))
    }
}

/// Session store statistics
#[derive(Debug, Clone, Serialize)]
pub struct SessionStoreStats {
    pub total_sessions: usize,
    pub expired_sessions: usize,
    pub active_sessions: usize,
}

/// Sweep expired sessions on a fixed period until the runtime stops
pub fn spawn_cleanup_task(store: Arc<SessionStore>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // First tick fires immediately
        interval.tick().await;

        loop {
            interval.tick().await;
            let removed = store.cleanup();
            if removed > 0 {
                debug!(removed, remaining = store.stats().total_sessions, "Session sweep");
            }
        }
    })
}

/// Session ids are bearer secrets; only log a prefix
pub(crate) fn short(session_id: &str) -> &str {
    session_id.get(..13).unwrap_or(session_id)
}
