//! Path pattern parsing, parameter extraction and injection.
//!
//! # Responsibilities
//! - Parse route patterns (`/user/:userId/tasks/:taskId`) into segments
//! - Match a concrete path against a pattern, extracting params
//! - Build a path from a pattern and a params map
//! - Split the query string off a path and parse it
//!
//! # Pattern Syntax
//! - `about`: literal segment, compared exactly (case-sensitive)
//! - `:name`: required dynamic segment
//! - `:name?`: optional dynamic segment
//! - `*`: splat, binds the remaining segments to `splat` (last segment only)
//!
//! # Design Decisions
//! - Segment-based matching, no regex
//! - Trailing and repeated slashes are ignored on both sides
//! - Values are percent-decoded on extraction and percent-encoded on injection
//! - Injection refuses values that would produce an empty segment, so every
//!   built path extracts back to the params it was built from

use std::fmt;

use thiserror::Error;
use url::form_urlencoded;

use crate::routing::{Params, Query};

/// Param name bound by a `*` segment.
pub const SPLAT_PARAM: &str = "splat";

/// Errors produced while parsing patterns or building paths.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    /// A required param was not supplied when building a path.
    #[error("missing param \"{param}\" for pattern \"{pattern}\"")]
    MissingParam { pattern: String, param: String },

    /// A param value would produce an empty path segment.
    ///
    /// Raised for an empty required or optional value, and for a splat value
    /// with an empty part (`a//b`, `/a`, `a/`). Leave an optional param out
    /// of the map to omit its segment.
    #[error("empty value for param \"{param}\" in pattern \"{pattern}\"")]
    EmptyParam { pattern: String, param: String },

    /// The same dynamic segment name appears twice in one pattern.
    #[error("duplicate param \"{param}\" in pattern \"{pattern}\"")]
    DuplicateParam { pattern: String, param: String },

    /// A `*` segment was followed by more segments.
    #[error("splat must be the last segment of pattern \"{pattern}\"")]
    SplatNotLast { pattern: String },

    /// `:` with no usable identifier after it.
    #[error("invalid param name \"{name}\" in pattern \"{pattern}\"")]
    InvalidParamName { pattern: String, name: String },
}

/// One segment of a parsed pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Static(String),
    Param(String),
    Optional(String),
    Splat,
}

/// A parsed route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    source: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Parse and validate a pattern.
    pub fn parse(source: &str) -> Result<Self, PatternError> {
        let mut segments = Vec::new();
        let mut seen: Vec<&str> = Vec::new();

        for raw in split_segments(source) {
            if let Some(Segment::Splat) = segments.last() {
                return Err(PatternError::SplatNotLast {
                    pattern: source.to_string(),
                });
            }

            let segment = match raw.strip_prefix(':') {
                Some(decl) => {
                    let (name, optional) = match decl.strip_suffix('?') {
                        Some(name) => (name, true),
                        None => (decl, false),
                    };
                    if !is_valid_param_name(name) {
                        return Err(PatternError::InvalidParamName {
                            pattern: source.to_string(),
                            name: name.to_string(),
                        });
                    }
                    if seen.contains(&name) {
                        return Err(PatternError::DuplicateParam {
                            pattern: source.to_string(),
                            param: name.to_string(),
                        });
                    }
                    seen.push(name);
                    if optional {
                        Segment::Optional(name.to_string())
                    } else {
                        Segment::Param(name.to_string())
                    }
                }
                None if raw == "*" => {
                    if seen.contains(&SPLAT_PARAM) {
                        return Err(PatternError::DuplicateParam {
                            pattern: source.to_string(),
                            param: SPLAT_PARAM.to_string(),
                        });
                    }
                    seen.push(SPLAT_PARAM);
                    Segment::Splat
                }
                None => Segment::Static(raw.to_string()),
            };
            segments.push(segment);
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Names of every dynamic segment, in declaration order.
    pub fn param_names(&self) -> Vec<String> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Param(name) | Segment::Optional(name) => Some(name.clone()),
                Segment::Splat => Some(SPLAT_PARAM.to_string()),
                Segment::Static(_) => None,
            })
            .collect()
    }

    /// Match `path` (query ignored) against this pattern.
    ///
    /// Returns `None` on any structural mismatch.
    pub fn extract(&self, path: &str) -> Option<Params> {
        let tokens: Vec<&str> = split_segments(without_query(path)).collect();
        let mut params = Params::new();
        match_segments(&self.segments, &tokens, &mut params).then_some(params)
    }

    /// Build a path by substituting `params` into this pattern.
    ///
    /// An empty splat value binds nothing and leaves the splat off the path.
    pub fn inject(&self, params: &Params) -> Result<String, PatternError> {
        let mut parts: Vec<String> = Vec::with_capacity(self.segments.len());

        for segment in &self.segments {
            match segment {
                Segment::Static(literal) => parts.push(literal.clone()),
                Segment::Param(name) => {
                    let value = params.get(name).ok_or_else(|| PatternError::MissingParam {
                        pattern: self.source.clone(),
                        param: name.clone(),
                    })?;
                    parts.push(self.encode_segment(name, value)?);
                }
                Segment::Optional(name) => {
                    if let Some(value) = params.get(name) {
                        parts.push(self.encode_segment(name, value)?);
                    }
                }
                Segment::Splat => {
                    if let Some(value) = params.get(SPLAT_PARAM).filter(|v| !v.is_empty()) {
                        let encoded = value
                            .split('/')
                            .map(|part| self.encode_segment(SPLAT_PARAM, part))
                            .collect::<Result<Vec<_>, _>>()?;
                        parts.push(encoded.join("/"));
                    }
                }
            }
        }

        Ok(format!("/{}", parts.join("/")))
    }

    fn encode_segment(&self, param: &str, value: &str) -> Result<String, PatternError> {
        if value.is_empty() {
            return Err(PatternError::EmptyParam {
                pattern: self.source.clone(),
                param: param.to_string(),
            });
        }
        Ok(urlencoding::encode(value).into_owned())
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

fn is_valid_param_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' || first == '$' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        }
        _ => false,
    }
}

// Params are only written once the remainder has matched, so a failed
// branch never leaves partial bindings behind.
fn match_segments(segments: &[Segment], tokens: &[&str], params: &mut Params) -> bool {
    let Some((segment, rest)) = segments.split_first() else {
        return tokens.is_empty();
    };

    match segment {
        Segment::Splat => {
            let mut decoded = Vec::with_capacity(tokens.len());
            for token in tokens {
                match urlencoding::decode(token) {
                    Ok(value) => decoded.push(value.into_owned()),
                    Err(_) => return false,
                }
            }
            params.insert(SPLAT_PARAM.to_string(), decoded.join("/"));
            true
        }
        Segment::Static(literal) => match tokens.split_first() {
            Some((token, more)) if token == literal => match_segments(rest, more, params),
            _ => false,
        },
        Segment::Param(name) => match tokens.split_first() {
            Some((token, more)) => bind(name, token, rest, more, params),
            None => false,
        },
        Segment::Optional(name) => {
            if let Some((token, more)) = tokens.split_first() {
                if bind(name, token, rest, more, params) {
                    return true;
                }
            }
            match_segments(rest, tokens, params)
        }
    }
}

fn bind(name: &str, token: &str, rest: &[Segment], more: &[&str], params: &mut Params) -> bool {
    let Ok(value) = urlencoding::decode(token) else {
        return false;
    };
    if !match_segments(rest, more, params) {
        return false;
    }
    params.insert(name.to_string(), value.into_owned());
    true
}

/// Extract params from `path` using `pattern`.
///
/// An invalid pattern never matches.
pub fn extract_params(pattern: &str, path: &str) -> Option<Params> {
    PathPattern::parse(pattern).ok()?.extract(path)
}

/// Param names declared by `pattern`, in order. Empty for an invalid pattern.
pub fn extract_param_names(pattern: &str) -> Vec<String> {
    PathPattern::parse(pattern)
        .map(|parsed| parsed.param_names())
        .unwrap_or_default()
}

/// Substitute `params` into `pattern`.
pub fn inject_params(pattern: &str, params: &Params) -> Result<String, PatternError> {
    PathPattern::parse(pattern)?.inject(params)
}

/// Parse the query string of `path`, if it has a non-empty one.
///
/// Repeated keys keep the last value.
pub fn extract_query(path: &str) -> Option<Query> {
    let (_, raw) = path.split_once('?')?;
    if raw.is_empty() {
        return None;
    }
    let query: Query = form_urlencoded::parse(raw.as_bytes())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    (!query.is_empty()).then_some(query)
}

/// `path` with any query string removed.
pub fn without_query(path: &str) -> &str {
    path.split_once('?').map_or(path, |(before, _)| before)
}

/// Append `query` to `path`, replacing any query it already has.
pub fn with_query(path: &str, query: &Query) -> String {
    let base = without_query(path);
    if query.is_empty() {
        return base.to_string();
    }
    let encoded = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(query.iter())
        .finish();
    format!("{base}?{encoded}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_static_pattern() {
        assert_eq!(extract_params("/about", "/about"), Some(Params::new()));
        assert_eq!(extract_params("/about", "/about/"), Some(Params::new()));
        assert_eq!(extract_params("/about", "/About"), None);
        assert_eq!(extract_params("/about", "/about/team"), None);
        assert_eq!(extract_params("/", "/"), Some(Params::new()));
        assert_eq!(extract_params("/", "/x"), None);
    }

    #[test]
    fn test_dynamic_segments() {
        let extracted = extract_params("/user/:userId/tasks/:taskId", "/user/123/tasks/foo");
        assert_eq!(extracted, Some(params(&[("userId", "123"), ("taskId", "foo")])));

        assert_eq!(extract_params("/user/:userId", "/user"), None);
        assert_eq!(extract_params("/user/:userId", "/user/1/2"), None);
    }

    #[test]
    fn test_query_is_ignored_when_matching() {
        let extracted = extract_params("/posts/:id", "/posts/7?sort=asc");
        assert_eq!(extracted, Some(params(&[("id", "7")])));
    }

    #[test]
    fn test_optional_segment() {
        let pattern = PathPattern::parse("/archive/:year?/posts").unwrap();
        assert_eq!(pattern.extract("/archive/posts"), Some(Params::new()));
        assert_eq!(
            pattern.extract("/archive/2014/posts"),
            Some(params(&[("year", "2014")]))
        );
        assert_eq!(pattern.inject(&Params::new()).unwrap(), "/archive/posts");
    }

    #[test]
    fn test_splat() {
        let pattern = PathPattern::parse("/files/*").unwrap();
        assert_eq!(
            pattern.extract("/files/a/b/c.txt"),
            Some(params(&[("splat", "a/b/c.txt")]))
        );
        assert_eq!(pattern.extract("/files"), Some(params(&[("splat", "")])));
        assert_eq!(pattern.inject(&params(&[("splat", "a/b c")])).unwrap(), "/files/a/b%20c");
    }

    #[test]
    fn test_percent_encoding_round_trip() {
        let pattern = "/search/:term";
        let original = params(&[("term", "rust & tokio/async")]);
        let path = inject_params(pattern, &original).unwrap();
        assert_eq!(path, "/search/rust%20%26%20tokio%2Fasync");
        assert_eq!(extract_params(pattern, &path), Some(original));
    }

    #[test]
    fn test_inject_extract_round_trip() {
        let cases = [
            ("/user/:userId", "/user/abc"),
            ("/user/:userId/tasks/:taskId", "/user/123/tasks/foo"),
            ("/files/*", "/files/docs/readme.md"),
            ("/", "/"),
        ];
        for (pattern, path) in cases {
            let extracted = extract_params(pattern, path).unwrap();
            assert_eq!(inject_params(pattern, &extracted).unwrap(), path);
        }
    }

    #[test]
    fn test_built_paths_extract_to_their_params() {
        let cases: &[(&str, &[(&str, &str)])] = &[
            ("/user/:userId", &[("userId", "abc")]),
            ("/user/:userId", &[("userId", "a b/c?d=e#f")]),
            ("/user/:userId/tasks/:taskId", &[("userId", "1"), ("taskId", "caf\u{e9}")]),
            ("/archive/:year?/posts", &[]),
            ("/archive/:year?/posts", &[("year", "2014")]),
            ("/files/*", &[("splat", "")]),
            ("/files/*", &[("splat", "a/b c/%2F")]),
            ("/", &[]),
        ];
        for (pattern, pairs) in cases {
            let original = params(pairs);
            let path = inject_params(pattern, &original).unwrap();
            assert_eq!(extract_params(pattern, &path), Some(original), "{pattern} via {path}");
        }
    }

    #[test]
    fn test_empty_values_are_rejected() {
        fn empty(pattern: &str, pairs: &[(&str, &str)]) -> bool {
            matches!(
                inject_params(pattern, &params(pairs)),
                Err(PatternError::EmptyParam { .. })
            )
        }
        assert!(empty("/user/:userId", &[("userId", "")]));
        assert!(empty("/archive/:year?", &[("year", "")]));
        assert!(empty("/files/*", &[("splat", "a//b")]));
        assert!(empty("/files/*", &[("splat", "/a")]));
        assert!(empty("/files/*", &[("splat", "a/")]));
        assert_eq!(inject_params("/archive/:year?", &Params::new()).unwrap(), "/archive");
    }

    #[test]
    fn test_missing_param() {
        let err = inject_params("/user/:userId", &Params::new()).unwrap_err();
        assert_eq!(
            err,
            PatternError::MissingParam {
                pattern: "/user/:userId".into(),
                param: "userId".into(),
            }
        );
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(matches!(
            PathPattern::parse("/a/:id/b/:id"),
            Err(PatternError::DuplicateParam { .. })
        ));
        assert!(matches!(
            PathPattern::parse("/a/*/b"),
            Err(PatternError::SplatNotLast { .. })
        ));
        assert!(matches!(
            PathPattern::parse("/a/:"),
            Err(PatternError::InvalidParamName { .. })
        ));
        assert_eq!(extract_params("/a/:id/:id", "/a/1/2"), None);
    }

    #[test]
    fn test_param_names() {
        let pattern = PathPattern::parse("/user/:userId/files/:kind?/*").unwrap();
        assert_eq!(pattern.param_names(), vec!["userId", "kind", "splat"]);
        assert_eq!(extract_param_names("/a/:b"), vec!["b"]);
        assert!(extract_param_names("/*/:late").is_empty());
    }

    #[test]
    fn test_query_helpers() {
        assert_eq!(extract_query("/a"), None);
        assert_eq!(extract_query("/a?"), None);

        let query = extract_query("/a?x=1&y=two%20words&x=3").unwrap();
        assert_eq!(query, params(&[("x", "3"), ("y", "two words")]));

        assert_eq!(without_query("/a/b?x=1"), "/a/b");
        assert_eq!(without_query("/a/b"), "/a/b");

        assert_eq!(with_query("/a?old=1", &params(&[("q", "a b")])), "/a?q=a+b");
        assert_eq!(with_query("/a?old=1", &Params::new()), "/a");
    }
}
