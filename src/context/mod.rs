//! Per-request context.
//!
//! # Data Flow
//! ```text
//! Request<Body>
//!     → Context::new (split head, keep body unread)
//!     → parse.rs (params → cookies → query → body)
//!     → handlers read/write params, query, cookies, body, data
//!     → response.rs (text / json / error close the response)
//!     → Context::into_response
//! ```
//!
//! # Design Decisions
//! - Owned by one request; never shared across tasks
//! - The response is "closed" once any helper has written it
//! - Writes after close are ignored and logged
//! - Headers staged before close (Set-Cookie) are merged into the response

pub mod body;
pub mod cookies;
pub mod parse;
pub mod response;

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, Uri};
use axum::response::Response;
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::routing::ParamValue;

pub use body::{BodyError, BodyParser, BodyParsers};
pub use cookies::{CookieError, CookiePolicy};

/// Mutable state for a single request.
pub struct Context {
    /// Coerced path parameters.
    pub params: HashMap<String, ParamValue>,
    /// Query parameters, coerced when declared, raw strings otherwise.
    pub query: HashMap<String, ParamValue>,
    /// Decoded request cookies.
    pub cookies: HashMap<String, String>,
    /// Parsed request body; an empty object when none was parsed.
    pub body: Value,
    /// Free-form values passed from middleware to later handlers.
    pub data: Map<String, Value>,

    method: Method,
    uri: Uri,
    headers: HeaderMap,
    raw_body: Option<Body>,
    cookie_policy: CookiePolicy,
    staged_headers: HeaderMap,
    response: Option<Response>,
}

impl Context {
    /// Create a context for `request`. The body stays unread until `parse_body`.
    pub fn new(request: Request<Body>) -> Self {
        let (parts, body) = request.into_parts();
        Self {
            params: HashMap::new(),
            query: HashMap::new(),
            cookies: HashMap::new(),
            body: Value::Object(Map::new()),
            data: Map::new(),
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            raw_body: Some(body),
            cookie_policy: CookiePolicy::default(),
            staged_headers: HeaderMap::new(),
            response: None,
        }
    }

    /// Replace the policy `set_cookies` follows.
    pub fn with_cookie_policy(mut self, policy: CookiePolicy) -> Self {
        self.cookie_policy = policy;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Token from an `Authorization: Bearer <token>` header.
    pub fn bearer(&self) -> Option<&str> {
        let value = self.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
        let token = value.strip_prefix("Bearer ")?.trim();
        (!token.is_empty() && !token.contains(char::is_whitespace)).then_some(token)
    }

    /// True once a response has been written.
    pub fn is_closed(&self) -> bool {
        self.response.is_some()
    }

    /// The written response, if any.
    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    /// Consume the context, yielding the written response.
    pub fn into_response(self) -> Response {
        match self.response {
            Some(response) => response,
            None => {
                tracing::error!(path = %self.uri.path(), "Request finished without a response");
                let mut response = Response::new(Body::from("Internal Server Error"));
                *response.status_mut() = axum::http::StatusCode::INTERNAL_SERVER_ERROR;
                response
            }
        }
    }
}
