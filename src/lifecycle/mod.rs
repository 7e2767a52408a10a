//! Lifecycle management.
//!
//! A `Shutdown` broadcast is handed to the server; triggering it drains
//! in-flight requests and stops the listener.

pub mod shutdown;

pub use shutdown::Shutdown;
