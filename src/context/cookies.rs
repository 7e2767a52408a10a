//! Response cookies.

use axum::http::{header, HeaderValue};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::context::Context;

/// Upper bound on the serialized cookie header.
pub const MAX_COOKIE_BYTES: usize = 4096;

/// How `set_cookies` emits cookies.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CookiePolicy {
    /// Ceiling for all pairs joined with `"; "`.
    pub max_bytes: usize,

    /// Emit a single combined `Set-Cookie` header instead of one per cookie.
    pub combine_set_cookie: bool,
}

impl Default for CookiePolicy {
    fn default() -> Self {
        Self {
            max_bytes: MAX_COOKIE_BYTES,
            combine_set_cookie: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CookieError {
    #[error("cookies need {len} bytes, limit is {max}")]
    TooLarge { len: usize, max: usize },

    #[error("invalid cookie name {0:?}")]
    InvalidName(String),

    #[error("response already closed")]
    ResponseClosed,
}

impl Context {
    /// Stage `name=percent_encoded(value)` cookies on the response.
    ///
    /// Nothing is set when any name is invalid or the serialized cookies
    /// exceed the policy's byte ceiling.
    pub fn set_cookies<I, K, V>(&mut self, cookies: I) -> Result<(), CookieError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Display,
    {
        if self.is_closed() {
            tracing::warn!(path = %self.path(), "Cannot set cookies on a closed response");
            return Err(CookieError::ResponseClosed);
        }

        let pairs = cookies
            .into_iter()
            .map(|(name, value)| {
                let name = name.as_ref();
                if !is_valid_name(name) {
                    return Err(CookieError::InvalidName(name.to_string()));
                }
                Ok(format!("{}={}", name, urlencoding::encode(&value.to_string())))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let combined = pairs.join("; ");
        if combined.len() > self.cookie_policy.max_bytes {
            tracing::error!(
                len = combined.len(),
                max = self.cookie_policy.max_bytes,
                "Max cookies length exceeded, will not set cookies"
            );
            return Err(CookieError::TooLarge {
                len: combined.len(),
                max: self.cookie_policy.max_bytes,
            });
        }

        // Names are validated and values percent-encoded, so every pair is a valid header value.
        let values = if self.cookie_policy.combine_set_cookie {
            vec![combined]
        } else {
            pairs
        };
        self.staged_headers.remove(header::SET_COOKIE);
        for value in values {
            if let Ok(value) = HeaderValue::from_str(&value) {
                self.staged_headers.append(header::SET_COOKIE, value);
            }
        }
        Ok(())
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_graphic() && !matches!(b, b'=' | b';' | b',' | b'"' | b'\\' | b'(' | b')')
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};

    fn ctx(policy: CookiePolicy) -> Context {
        Context::new(Request::builder().uri("/").body(Body::empty()).unwrap()).with_cookie_policy(policy)
    }

    fn set_cookie_headers(ctx: Context) -> Vec<String> {
        ctx.into_response()
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_one_header_per_cookie() {
        let mut c = ctx(CookiePolicy::default());
        c.set_cookies([("sessionId", "abc"), ("theme", "dark mode")]).unwrap();
        c.text("ok", StatusCode::OK);
        assert_eq!(set_cookie_headers(c), vec!["sessionId=abc", "theme=dark%20mode"]);
    }

    #[test]
    fn test_combined_header() {
        let mut c = ctx(CookiePolicy {
            combine_set_cookie: true,
            ..CookiePolicy::default()
        });
        c.set_cookies([("a", 1), ("b", 2)]).unwrap();
        c.text("ok", StatusCode::OK);
        assert_eq!(set_cookie_headers(c), vec!["a=1; b=2"]);
    }

    #[test]
    fn test_too_large_sets_nothing() {
        let mut c = ctx(CookiePolicy::default());
        let big = "x".repeat(MAX_COOKIE_BYTES);
        let err = c.set_cookies([("big", big.as_str())]).unwrap_err();
        assert!(matches!(err, CookieError::TooLarge { max: MAX_COOKIE_BYTES, .. }));
        c.text("ok", StatusCode::OK);
        assert!(set_cookie_headers(c).is_empty());
    }

    #[test]
    fn test_ceiling_is_inclusive() {
        // "big=" plus the value fills the header exactly.
        let at_limit = "x".repeat(MAX_COOKIE_BYTES - "big=".len());
        let mut c = ctx(CookiePolicy::default());
        c.set_cookies([("big", at_limit.as_str())]).unwrap();
        c.text("ok", StatusCode::OK);
        let headers = set_cookie_headers(c);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[0].len(), MAX_COOKIE_BYTES);

        let over = "x".repeat(MAX_COOKIE_BYTES - "big=".len() + 1);
        let mut c = ctx(CookiePolicy::default());
        assert_eq!(
            c.set_cookies([("big", over.as_str())]),
            Err(CookieError::TooLarge {
                len: MAX_COOKIE_BYTES + 1,
                max: MAX_COOKIE_BYTES
            })
        );
    }

    #[test]
    fn test_combined_ceiling_counts_separators() {
        // Two pairs of 2046 bytes joined by "; " come to 4094.
        let value = "y".repeat(2044);
        let mut c = ctx(CookiePolicy::default());
        assert!(c.set_cookies([("a", value.as_str()), ("b", value.as_str())]).is_ok());

        let value = "y".repeat(2046);
        let mut c = ctx(CookiePolicy::default());
        assert_eq!(
            c.set_cookies([("a", value.as_str()), ("b", value.as_str())]),
            Err(CookieError::TooLarge {
                len: 4098,
                max: MAX_COOKIE_BYTES
            })
        );
    }

    #[test]
    fn test_invalid_name() {
        let mut c = ctx(CookiePolicy::default());
        assert_eq!(
            c.set_cookies([("bad name", "v")]),
            Err(CookieError::InvalidName("bad name".into()))
        );
    }

    #[test]
    fn test_closed_response() {
        let mut c = ctx(CookiePolicy::default());
        c.text("done", StatusCode::OK);
        assert_eq!(c.set_cookies([("a", "b")]), Err(CookieError::ResponseClosed));
    }
}
