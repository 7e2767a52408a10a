//! Session subsystem.
//!
//! # Lifecycle
//! ```text
//! absent ──create──▶ active ──update / get (before expiry)──▶ active
//!                      │
//!                      └──end / get (after expiry)──▶ absent
//! ```
//!
//! # Design Decisions
//! - Ids are 24 random bytes from the OS generator, hex encoded
//! - Expiry is checked lazily on access; there is no background sweep
//! - `uid` is fixed at creation; every other field may be updated
//! - The store is consumed through boxed futures so in-memory and remote
//!   stores look the same to middleware

pub mod clock;
pub mod memory;

use chrono::{DateTime, TimeZone, Utc};
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

pub use clock::{Clock, ManualClock, SystemClock};
pub use memory::InMemorySessionStore;

/// Default session lifetime: 15 minutes.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(15 * 60);

/// Arbitrary JSON fields attached to a session or user.
pub type Fields = Map<String, Value>;

/// A stored session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEntry {
    pub uid: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: Fields,
}

impl SessionEntry {
    /// True while `expires` lies strictly after `now`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires > now
    }

    /// An extra field stored with the session.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("session requires a uid")]
    MissingUid,

    #[error("unknown session")]
    UnknownSession,

    #[error("invalid expires value: {0}")]
    InvalidExpiry(Value),
}

/// Capability consumed by session middleware.
pub trait SessionStore: Send + Sync {
    /// Create a session for `fields.uid`, returning its id.
    fn create_session(&self, fields: Fields, ttl: Duration) -> BoxFuture<'_, Result<String, SessionError>>;

    /// Fetch a live session; an expired one is removed and reported absent.
    fn get_session<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Option<SessionEntry>>;

    /// Remove a session, reporting whether it existed.
    fn end_session<'a>(&'a self, id: &'a str) -> BoxFuture<'a, bool>;

    /// Merge `updates` into a session. `uid` is never changed.
    fn update_session<'a>(&'a self, id: &'a str, updates: Fields) -> BoxFuture<'a, Result<(), SessionError>>;
}

/// Read the `uid` out of creation fields. Numbers are accepted and stringified.
pub(crate) fn uid_from(fields: &Fields) -> Result<String, SessionError> {
    match fields.get("uid") {
        Some(Value::String(uid)) if !uid.is_empty() => Ok(uid.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(SessionError::MissingUid),
    }
}

/// Interpret an `expires` update: epoch milliseconds or an RFC 3339 string.
pub(crate) fn expiry_from(value: &Value) -> Result<DateTime<Utc>, SessionError> {
    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    };
    parsed.ok_or_else(|| SessionError::InvalidExpiry(value.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_uid_from() {
        let fields = |v: Value| v.as_object().cloned().unwrap();
        assert_eq!(uid_from(&fields(json!({ "uid": "u1" }))), Ok("u1".into()));
        assert_eq!(uid_from(&fields(json!({ "uid": 7 }))), Ok("7".into()));
        assert_eq!(uid_from(&fields(json!({ "uid": "" }))), Err(SessionError::MissingUid));
        assert_eq!(uid_from(&fields(json!({ "name": "x" }))), Err(SessionError::MissingUid));
    }

    #[test]
    fn test_expiry_from() {
        assert_eq!(expiry_from(&json!(0)).unwrap().timestamp(), 0);
        assert_eq!(
            expiry_from(&json!("2030-01-01T00:00:00Z")).unwrap().to_rfc3339(),
            "2030-01-01T00:00:00+00:00"
        );
        assert!(expiry_from(&json!(true)).is_err());
    }

    #[test]
    fn test_entry_serializes_flat() {
        let mut extra = Fields::new();
        extra.insert("role".into(), json!("admin"));
        let entry = SessionEntry {
            uid: "u1".into(),
            expires: Utc.timestamp_millis_opt(1_000).single().unwrap(),
            extra,
        };
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({ "uid": "u1", "expires": 1000, "role": "admin" })
        );
    }
}
