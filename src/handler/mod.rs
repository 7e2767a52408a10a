//! Handler contract.
//!
//! A handler receives the per-request [`Context`] and resolves to a
//! [`HandlerResult`]:
//!
//! - `Err(Rejection)` stops the chain and becomes the response.
//! - `Ok(Reply)` records a status and, optionally, a payload; the chain moves on.
//! - `Ok(Reply::next())` declares nothing and simply falls through.
//!
//! Handlers that write the response themselves (through the context helpers)
//! close it; the chain stops observing the route afterwards.

pub mod chain;

use axum::http::StatusCode;
pub use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::context::Context;

/// Result of a single handler invocation.
pub type HandlerResult = Result<Reply, Rejection>;

/// A unit of the per-route handler chain.
pub trait Handler: Send + Sync + 'static {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult>;
}

impl<F> Handler for F
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
        (self)(ctx)
    }
}

/// Adapter turning a synchronous closure into a [`Handler`].
pub struct HandlerFn<F>(F);

impl<F> HandlerFn<F> {
    /// Wrap a synchronous closure.
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Handler for HandlerFn<F>
where
    F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move { (self.0)(ctx) })
    }
}

/// Response body declared by a handler.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Json(Value),
}

/// Successful handler outcome.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reply {
    pub status: Option<StatusCode>,
    pub payload: Option<Payload>,
}

impl Reply {
    /// Declare nothing; the chain continues.
    pub fn next() -> Self {
        Self::default()
    }

    /// Declare a JSON payload with the default status.
    pub fn json(value: Value) -> Self {
        Self {
            status: None,
            payload: Some(Payload::Json(value)),
        }
    }

    /// Declare a plain-text payload with the default status.
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            status: None,
            payload: Some(Payload::Text(body.into())),
        }
    }

    /// Set the response status.
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }
}

/// Handler-declared failure: stops the chain and becomes the response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct Rejection {
    pub message: String,
    pub code: StatusCode,
}

impl Rejection {
    /// Create a new rejection with an explicit status.
    pub fn new(message: impl Into<String>, code: StatusCode) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }

    /// 400 Bad Request.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::BAD_REQUEST)
    }

    /// 403 Forbidden.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::FORBIDDEN)
    }

    /// 500 Internal Server Error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::INTERNAL_SERVER_ERROR)
    }
}
