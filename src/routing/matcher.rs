//! Path template compilation and matching.
//!
//! # Responsibilities
//! - Split a template such as `/users/:id/posts` into segments
//! - Record the segment index of every `:name` parameter
//! - Compile one anchored regex per template
//!
//! # Design Decisions
//! - Literal segments are regex-escaped and matched verbatim (case-sensitive)
//! - A parameter matches any non-empty run without `/` or `?`
//! - An optional `?query` suffix is accepted so raw request targets match too
//! - Malformed templates are rejected at compile time

use regex::Regex;

use crate::routing::RouteError;

/// Prefix marking a named parameter segment.
pub const PARAM_MARKER: char = ':';

const PARAM_PATTERN: &str = "([^/?]+)";
const QUERY_SUFFIX: &str = r"(?:\?.*)?";

/// A named parameter and the path segment it occupies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSlot {
    pub index: usize,
    pub name: String,
}

/// Compiled form of a path template.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    template: String,
    regex: Regex,
    slots: Vec<ParamSlot>,
}

impl PathMatcher {
    /// Compile a path template.
    pub fn compile(template: &str) -> Result<Self, RouteError> {
        let malformed = |reason: &str| RouteError::MalformedTemplate {
            template: template.to_string(),
            reason: reason.to_string(),
        };

        let rest = template
            .strip_prefix('/')
            .ok_or_else(|| malformed("must start with '/'"))?;

        let mut pattern = String::with_capacity(template.len() + 16);
        pattern.push('^');
        let mut slots: Vec<ParamSlot> = Vec::new();

        if rest.is_empty() {
            pattern.push('/');
        } else {
            for (index, segment) in rest.split('/').enumerate() {
                if segment.is_empty() {
                    return Err(malformed("empty path segment"));
                }
                pattern.push('/');
                match segment.strip_prefix(PARAM_MARKER) {
                    Some("") => return Err(malformed("parameter without a name")),
                    Some(name) => {
                        if slots.iter().any(|s| s.name == name) {
                            return Err(RouteError::DuplicateParam {
                                template: template.to_string(),
                                name: name.to_string(),
                            });
                        }
                        slots.push(ParamSlot {
                            index,
                            name: name.to_string(),
                        });
                        pattern.push_str(PARAM_PATTERN);
                    }
                    None => pattern.push_str(&regex::escape(segment)),
                }
            }
        }

        pattern.push_str(QUERY_SUFFIX);
        pattern.push('$');

        let regex = Regex::new(&pattern).map_err(|e| malformed(&e.to_string()))?;

        Ok(Self {
            template: template.to_string(),
            regex,
            slots,
        })
    }

    /// Returns true if `path` (optionally carrying a query string) matches.
    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Parameter slots in template order.
    pub fn slots(&self) -> &[ParamSlot] {
        &self.slots
    }

    /// The template this matcher was compiled from.
    pub fn template(&self) -> &str {
        &self.template
    }
}

/// Split a request path into its non-empty segments, dropping any query string.
pub fn path_segments(path: &str) -> Vec<&str> {
    let path = path.split('?').next().unwrap_or_default();
    path.split('/').filter(|s| !s.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_template() {
        let m = PathMatcher::compile("/ping").unwrap();
        assert!(m.matches("/ping"));
        assert!(m.matches("/ping?verbose=1"));
        assert!(!m.matches("/ping/pong"));
        assert!(!m.matches("/Ping"));
        assert!(!m.matches("/pin"));
        assert!(m.slots().is_empty());
    }

    #[test]
    fn test_root_template() {
        let m = PathMatcher::compile("/").unwrap();
        assert!(m.matches("/"));
        assert!(m.matches("/?a=b"));
        assert!(!m.matches("/x"));
    }

    #[test]
    fn test_param_slots() {
        let m = PathMatcher::compile("/users/:id/posts/:post").unwrap();
        assert_eq!(
            m.slots(),
            &[
                ParamSlot { index: 1, name: "id".into() },
                ParamSlot { index: 3, name: "post".into() },
            ]
        );
        assert!(m.matches("/users/7/posts/abc"));
        assert!(m.matches("/users/7/posts/abc?sort=asc"));
        assert!(!m.matches("/users//posts/abc"));
        assert!(!m.matches("/users/7/comments/abc"));
        assert!(!m.matches("/users/7/posts/abc/extra"));
    }

    #[test]
    fn test_literal_is_escaped() {
        let m = PathMatcher::compile("/v1.0/items").unwrap();
        assert!(m.matches("/v1.0/items"));
        assert!(!m.matches("/v1x0/items"));
    }

    #[test]
    fn test_malformed_templates() {
        for template in ["", "ping", "/a//b", "/a/", "/a/:"] {
            assert!(
                matches!(
                    PathMatcher::compile(template),
                    Err(RouteError::MalformedTemplate { .. })
                ),
                "template {:?} should be rejected",
                template
            );
        }
        assert!(matches!(
            PathMatcher::compile("/:id/x/:id"),
            Err(RouteError::DuplicateParam { .. })
        ));
    }

    #[test]
    fn test_path_segments() {
        assert_eq!(path_segments("/a/b/c"), vec!["a", "b", "c"]);
        assert_eq!(path_segments("/a/b?x=/y"), vec!["a", "b"]);
        assert!(path_segments("/").is_empty());
    }
}
