//! Response helpers. Each one closes the response; later writes are ignored.

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use serde::Serialize;

use crate::context::Context;
use crate::handler::Rejection;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const APPLICATION_JSON: &str = "application/json";
const EMPTY_OBJECT: &[u8] = b"{}";

impl Context {
    /// Respond with a plain-text body.
    pub fn text(&mut self, body: impl Into<String>, status: StatusCode) {
        self.write(status, TEXT_PLAIN, Body::from(body.into()));
    }

    /// Respond with a JSON body. A payload serializing to `null` is sent as `{}`.
    ///
    /// A payload that fails to serialize is answered with a 500.
    pub fn json<T: Serialize + ?Sized>(&mut self, payload: &T, status: StatusCode) {
        self.write_json(serde_json::to_vec(payload), status);
    }

    /// Like [`Context::json`], indented for humans.
    pub fn json_pretty<T: Serialize + ?Sized>(&mut self, payload: &T, status: StatusCode) {
        self.write_json(serde_json::to_vec_pretty(payload), status);
    }

    /// Respond with a plain-text error message.
    pub fn error(&mut self, message: impl Into<String>, status: StatusCode) {
        self.text(message, status);
    }

    /// Respond with a handler rejection.
    pub fn reject(&mut self, rejection: &Rejection) {
        self.error(rejection.message.clone(), rejection.code);
    }

    fn write_json(&mut self, encoded: serde_json::Result<Vec<u8>>, status: StatusCode) {
        match encoded {
            Ok(bytes) if bytes == b"null" => {
                self.write(status, APPLICATION_JSON, Body::from(EMPTY_OBJECT))
            }
            Ok(bytes) => self.write(status, APPLICATION_JSON, Body::from(bytes)),
            Err(e) => {
                tracing::error!(path = %self.path(), error = %e, "Failed to serialize response");
                self.error("Failed to serialize response", StatusCode::INTERNAL_SERVER_ERROR);
            }
        }
    }

    fn write(&mut self, status: StatusCode, content_type: &'static str, body: Body) {
        if self.is_closed() {
            tracing::warn!(path = %self.path(), status = %status, "Response already closed, write ignored");
            return;
        }

        let mut response = Response::new(body);
        *response.status_mut() = status;
        let headers = response.headers_mut();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        headers.extend(std::mem::take(&mut self.staged_headers));

        self.response = Some(response);
    }
}
