//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration:
//!     Route (method, template, schemas, handlers)
//!     → route.rs (validate, assign segment indices)
//!     → matcher.rs (compile anchored regex)
//!     → router.rs (append to method bucket)
//!
//! Lookup:
//!     (method, path)
//!     → router.rs (scan bucket in registration order)
//!     → Return: matched CompiledRoute or None
//! ```
//!
//! # Design Decisions
//! - Routes compiled once at registration, immutable afterwards
//! - Deterministic: same input always matches same route
//! - First match wins (registration order)

pub mod coerce;
pub mod matcher;
pub mod route;
pub mod router;

pub use coerce::{Coercion, CoercionError, ParamValue};
pub use route::{CompiledRoute, Route};
pub use router::Router;

/// Errors raised while registering a route.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("malformed path template '{template}': {reason}")]
    MalformedTemplate { template: String, reason: String },

    #[error("parameter '{name}' appears twice in '{template}'")]
    DuplicateParam { template: String, name: String },

    #[error("schema declares parameter '{name}' which is not in '{template}'")]
    UnknownParam { template: String, name: String },

    #[error("unsupported method {0}")]
    UnsupportedMethod(String),

    #[error("route {method} {path} has no handlers")]
    EmptyChain { method: String, path: String },
}
