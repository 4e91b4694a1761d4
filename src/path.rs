//! Path patterns and positional parameter extraction.
//!
//! A pattern is split on `/` exactly like the concrete path, so both sides
//! keep their empty leading segment and any trailing empty segment. Matching
//! is segment-by-segment with no backtracking:
//!
//! - segment counts must be equal, `/a/:b` never matches `/a/b/c`;
//! - a `:name` segment binds whatever sits at that position, unvalidated;
//! - every other segment must equal the concrete segment byte-for-byte.
//!
//! ```rust
//! use switchyard::path::match_path;
//!
//! let params = match_path("/users/:id/posts/:post", "/users/7/posts/hello").unwrap();
//! assert_eq!(params.get("id"), Some("7"));
//! assert_eq!(params.get("post"), Some("hello"));
//!
//! assert!(match_path("/users/:id", "/users/7/posts").is_none());
//! ```

use std::fmt;

/// One `/`-separated piece of a [`Pattern`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Segment {
    Literal(String),
    Param(String),
}

/// A compiled route pattern. Parsed once at registration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Pattern {
    raw: String,
    segments: Vec<Segment>,
}

impl Pattern {
    pub fn parse(raw: &str) -> Self {
        let segments = raw
            .split('/')
            .map(|s| match s.strip_prefix(':') {
                Some(name) => Segment::Param(name.to_owned()),
                None => Segment::Literal(s.to_owned()),
            })
            .collect();
        Self { raw: raw.to_owned(), segments }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of segments, including the empty one before a leading `/`.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Matches a concrete request path, returning the bound parameters.
    pub fn matches(&self, path: &str) -> Option<Params> {
        let parts: Vec<&str> = path.split('/').collect();
        self.match_segments(&parts)
    }

    /// Matches an already split path. The router splits once per dispatch
    /// and reuses the pieces for every candidate pattern.
    pub(crate) fn match_segments(&self, parts: &[&str]) -> Option<Params> {
        if parts.len() != self.segments.len() {
            return None;
        }
        let mut params = Params::default();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Param(name) => params.insert(name, part),
                Segment::Literal(lit) if lit == part => {}
                Segment::Literal(_) => return None,
            }
        }
        Some(params)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Matches `path` against the textual `pattern` in one call.
///
/// Returns `None` when the path does not fit; otherwise the parameters bound
/// by the pattern's `:name` segments (possibly none).
pub fn match_path(pattern: &str, path: &str) -> Option<Params> {
    Pattern::parse(pattern).matches(path)
}

/// Parameters bound by a successful match, kept in pattern order.
///
/// Keys are unique: if a pattern names the same parameter twice, the later
/// segment's value replaces the earlier one in place.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn insert(&mut self, name: &str, value: &str) {
        match self.0.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.to_owned(),
            None => self.0.push((name.to_owned(), value.to_owned())),
        }
    }
}
