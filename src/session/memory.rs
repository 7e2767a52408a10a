//! In-memory session store.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{self, BoxFuture, FutureExt};
use rand::rngs::OsRng;
use rand::RngCore;
use std::sync::Arc;
use std::time::Duration;

use crate::observability::metrics;
use crate::session::{expiry_from, uid_from, Clock, Fields, SessionEntry, SessionError, SessionStore, SystemClock};

/// Length of the random part of a session id, in bytes.
pub const SESSION_ID_BYTES: usize = 24;

/// A thread-safe, process-local session store.
#[derive(Clone)]
pub struct InMemorySessionStore {
    sessions: Arc<DashMap<String, SessionEntry>>,
    clock: Arc<dyn Clock>,
}

impl InMemorySessionStore {
    /// Create an empty store on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store reading time from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            clock,
        }
    }

    /// Create a session for `fields.uid` expiring after `ttl`.
    pub fn create(&self, fields: Fields, ttl: Duration) -> Result<String, SessionError> {
        let uid = uid_from(&fields)?;
        let expires = expiry_after(self.clock.now(), ttl);
        let extra: Fields = fields
            .into_iter()
            .filter(|(key, _)| key != "uid" && key != "expires")
            .collect();

        let entry = SessionEntry { uid, expires, extra };
        let id = loop {
            let id = generate_session_id();
            if let Entry::Vacant(slot) = self.sessions.entry(id.clone()) {
                slot.insert(entry);
                break id;
            }
        };

        metrics::record_sessions_active(self.sessions.len());
        tracing::debug!(expires = %expires, "Session created");
        Ok(id)
    }

    /// Fetch a live session, evicting it if it has expired.
    pub fn get(&self, id: &str) -> Option<SessionEntry> {
        let now = self.clock.now();
        if self.sessions.remove_if(id, |_, entry| !entry.is_active_at(now)).is_some() {
            metrics::record_sessions_active(self.sessions.len());
            tracing::debug!("Expired session evicted");
            return None;
        }
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    /// Remove a session, reporting whether it existed.
    pub fn end(&self, id: &str) -> bool {
        let removed = self.sessions.remove(id).is_some();
        if removed {
            metrics::record_sessions_active(self.sessions.len());
        }
        removed
    }

    /// Merge `updates` into a live session. An expired session counts as unknown.
    pub fn update(&self, id: &str, updates: Fields) -> Result<(), SessionError> {
        let expires = updates.get("expires").map(expiry_from).transpose()?;

        if self.get(id).is_none() {
            return Err(SessionError::UnknownSession);
        }
        let mut entry = self.sessions.get_mut(id).ok_or(SessionError::UnknownSession)?;

        for (key, value) in updates {
            match key.as_str() {
                "uid" | "expires" => {}
                _ => {
                    entry.extra.insert(key, value);
                }
            }
        }
        if let Some(expires) = expires {
            entry.expires = expires;
        }
        Ok(())
    }

    /// Number of stored sessions, expired ones not yet evicted included.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for InMemorySessionStore {
    fn create_session(&self, fields: Fields, ttl: Duration) -> BoxFuture<'_, Result<String, SessionError>> {
        future::ready(self.create(fields, ttl)).boxed()
    }

    fn get_session<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Option<SessionEntry>> {
        future::ready(self.get(id)).boxed()
    }

    fn end_session<'a>(&'a self, id: &'a str) -> BoxFuture<'a, bool> {
        future::ready(self.end(id)).boxed()
    }

    fn update_session<'a>(&'a self, id: &'a str, updates: Fields) -> BoxFuture<'a, Result<(), SessionError>> {
        future::ready(self.update(id, updates)).boxed()
    }
}

/// 24 bytes from the OS generator, hex encoded.
pub fn generate_session_id() -> String {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
