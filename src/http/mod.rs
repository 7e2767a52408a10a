//! HTTP front end.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum fallback, request ID, trace, timeout)
//!     → dispatcher.rs (route lookup, parsing pipeline, handler chain)
//!     → Response
//! ```

pub mod dispatcher;
pub mod request;
pub mod server;

pub use dispatcher::{DispatchError, Dispatcher};
pub use request::X_REQUEST_ID;
pub use server::HttpServer;
