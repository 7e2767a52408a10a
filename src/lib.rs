//! espresso: a small HTTP request engine.
//!
//! Requests are matched against registered [`Route`]s, parsed into a
//! per-request [`Context`] and run through the route's handler chain.
//! An in-memory [`SessionStore`](session::SessionStore) with expiry backs
//! cookie sessions.

pub mod apps;
pub mod auth;
pub mod config;
pub mod context;
pub mod handler;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod session;

pub use config::EspressoConfig;
pub use context::Context;
pub use handler::{Handler, HandlerResult, Rejection, Reply};
pub use http::{Dispatcher, HttpServer};
pub use lifecycle::Shutdown;
pub use routing::{Coercion, Route, Router};
pub use session::{InMemorySessionStore, SessionStore};
