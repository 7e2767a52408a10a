//! Authentication helpers built on the handler chain.
//!
//! The guards are ordinary handlers placed before a route's own handlers:
//! they either reject with 403 or attach the user (password removed) to
//! `ctx.data["user"]` and let the chain continue.

pub mod protect;
pub mod users;

pub use protect::{bearer_protect, session_protect, BearerProtect, SessionProtect, SESSION_COOKIE, USER_KEY};
pub use users::{InMemoryUserStore, User, UserStore};
