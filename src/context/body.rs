//! Request body parsers keyed by content type.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub const APPLICATION_JSON: &str = "application/json";
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Why a request body could not be turned into `ctx.body`.
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("missing content-type")]
    MissingContentType,

    #[error("unsupported content-type: {0}")]
    UnsupportedContentType(String),

    #[error("body parser for {0} is not implemented")]
    NotImplemented(&'static str),

    #[error("malformed json body: {0}")]
    MalformedJson(#[from] serde_json::Error),

    #[error("body exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("failed to read body: {0}")]
    Read(String),
}

/// Parses a fully buffered body into a JSON value.
pub trait BodyParser: Send + Sync {
    fn parse(&self, bytes: &[u8]) -> Result<Value, BodyError>;
}

/// `application/json`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonParser;

impl BodyParser for JsonParser {
    fn parse(&self, bytes: &[u8]) -> Result<Value, BodyError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Placeholder for a recognised but unimplemented content type.
#[derive(Debug, Clone, Copy)]
pub struct Unimplemented(pub &'static str);

impl BodyParser for Unimplemented {
    fn parse(&self, _bytes: &[u8]) -> Result<Value, BodyError> {
        Err(BodyError::NotImplemented(self.0))
    }
}

/// Registry of body parsers by media type.
#[derive(Clone)]
pub struct BodyParsers {
    parsers: HashMap<String, Arc<dyn BodyParser>>,
}

impl BodyParsers {
    /// A registry with no parsers at all.
    pub fn empty() -> Self {
        Self {
            parsers: HashMap::new(),
        }
    }

    /// Register (or replace) the parser for a media type.
    pub fn register(&mut self, media_type: &str, parser: impl BodyParser + 'static) {
        self.parsers
            .insert(media_type.to_ascii_lowercase(), Arc::new(parser));
    }

    /// Look up the parser for a `Content-Type` header value.
    pub fn for_content_type(&self, content_type: &str) -> Result<&dyn BodyParser, BodyError> {
        let media = media_type(content_type);
        self.parsers
            .get(&media)
            .map(|p| p.as_ref())
            .ok_or(BodyError::UnsupportedContentType(media))
    }
}

impl Default for BodyParsers {
    fn default() -> Self {
        let mut parsers = Self::empty();
        parsers.register(APPLICATION_JSON, JsonParser);
        parsers.register(FORM_URLENCODED, Unimplemented(FORM_URLENCODED));
        parsers
    }
}

/// The media type of a content-type value, parameters stripped and lowercased.
pub fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
