//! User-store capability and an in-memory implementation.

use dashmap::DashMap;
use futures_util::future::{self, BoxFuture, FutureExt};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::session::Fields;

/// A stored user: arbitrary JSON fields, `uid` included.
pub type User = Fields;

/// Field holding the user id.
pub const USER_ID_FIELD: &str = "uid";

/// Fields a new user must carry.
pub const REQUIRED_USER_FIELDS: [&str; 2] = ["email", "password"];

/// Capability consumed by the auth middleware.
pub trait UserStore: Send + Sync {
    fn get_user<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Option<User>>;

    /// Store a new user, returning its id, or `None` when required fields are missing.
    fn create_user(&self, fields: Fields) -> BoxFuture<'_, Option<String>>;
}

/// Process-local user store.
#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<DashMap<String, User>>,
}

impl InMemoryUserStore {
    /// Create an empty user store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a user by id.
    pub fn get(&self, id: &str) -> Option<User> {
        self.users.get(id).map(|user| user.value().clone())
    }

    /// Store a user under a fresh id, or `None` when email or password is missing.
    pub fn create(&self, mut fields: Fields) -> Option<String> {
        let complete = REQUIRED_USER_FIELDS
            .iter()
            .all(|key| matches!(fields.get(*key), Some(Value::String(s)) if !s.is_empty()));
        if !complete {
            return None;
        }

        let id = Uuid::new_v4().simple().to_string();
        fields.insert(USER_ID_FIELD.to_string(), Value::String(id.clone()));
        self.users.insert(id.clone(), fields);
        tracing::debug!(uid = %id, "User created");
        Some(id)
    }

    /// First user whose `field` equals `value`.
    pub fn find_by(&self, field: &str, value: &Value) -> Option<User> {
        self.users
            .iter()
            .find(|user| user.value().get(field) == Some(value))
            .map(|user| user.value().clone())
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl UserStore for InMemoryUserStore {
    fn get_user<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Option<User>> {
        future::ready(self.get(id)).boxed()
    }

    fn create_user(&self, fields: Fields) -> BoxFuture<'_, Option<String>> {
        future::ready(self.create(fields)).boxed()
    }
}

/// A copy of `user` safe to hand to handlers: the password is dropped.
pub fn without_password(mut user: User) -> User {
    user.remove("password");
    user
}
