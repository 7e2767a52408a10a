//! Request parsing pipeline.
//!
//! The dispatcher calls these in a fixed order: params, cookies, query, body.
//! Each step's effects are visible to the next.

use axum::http::header;
use std::borrow::Cow;

use crate::context::body::{BodyError, BodyParsers};
use crate::context::Context;
use crate::routing::matcher::path_segments;
use crate::routing::{CoercionError, CompiledRoute, ParamValue};

impl Context {
    /// Coerce the route's declared path parameters into `params`.
    pub fn parse_params(&mut self, route: &CompiledRoute) -> Result<(), CoercionError> {
        if route.params().is_empty() {
            return Ok(());
        }

        let segments = path_segments(self.uri.path());
        for param in route.params() {
            let Some(&raw) = segments.get(param.index) else {
                continue;
            };
            let decoded = urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw));
            let value = param.coercion.apply(&decoded)?;
            self.params.insert(param.name.clone(), value);
        }
        Ok(())
    }

    /// Decode the `Cookie` header(s) into `cookies`.
    ///
    /// Entries without a name or value, or whose value is not valid
    /// percent-encoded UTF-8, are skipped.
    pub fn parse_cookies(&mut self) {
        for header_value in self.headers.get_all(header::COOKIE) {
            let Ok(raw) = header_value.to_str() else {
                tracing::debug!("Ignoring non-ASCII cookie header");
                continue;
            };

            for pair in raw.split(';') {
                let Some((name, value)) = pair.split_once('=') else {
                    continue;
                };
                let (name, value) = (name.trim(), value.trim());
                if name.is_empty() || value.is_empty() {
                    continue;
                }
                match urlencoding::decode(value) {
                    Ok(decoded) => {
                        self.cookies.insert(name.to_string(), decoded.into_owned());
                    }
                    Err(_) => tracing::debug!(cookie = %name, "Skipping undecodable cookie"),
                }
            }
        }
    }

    /// Split the query string into `query`, coercing keys the route declares.
    pub fn parse_query(&mut self, route: &CompiledRoute) -> Result<(), CoercionError> {
        let Some(query) = self.uri.query() else {
            return Ok(());
        };

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let parsed = match route.query_coercion(&key) {
                Some(coercion) => coercion.apply(&value)?,
                None => ParamValue::Str(value.into_owned()),
            };
            self.query.insert(key.into_owned(), parsed);
        }
        Ok(())
    }

    /// Read the body (at most `limit` bytes) and parse it by content type.
    ///
    /// A request with neither a body nor a `Content-Type` keeps the empty
    /// object default.
    pub async fn parse_body(&mut self, parsers: &BodyParsers, limit: usize) -> Result<(), BodyError> {
        let declared_len = self
            .headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        if declared_len.is_some_and(|len| len > limit) {
            return Err(BodyError::TooLarge { limit });
        }

        let body = self.raw_body.take().unwrap_or_default();
        let bytes = axum::body::to_bytes(body, limit)
            .await
            .map_err(|e| BodyError::Read(e.to_string()))?;

        let content_type = match self.headers.get(header::CONTENT_TYPE) {
            Some(value) => value
                .to_str()
                .map_err(|_| BodyError::UnsupportedContentType("<non-ascii>".to_string()))?,
            None if bytes.is_empty() => return Ok(()),
            None => return Err(BodyError::MissingContentType),
        };

        let parser = parsers.for_content_type(content_type)?;
        self.body = parser.parse(&bytes)?;
        Ok(())
    }
}
