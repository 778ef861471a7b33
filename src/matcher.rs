//! Path pattern matching
//!
//! A pattern is matched against a *prefix* of the remaining path: each level of
//! the route tree consumes its own segments and hands the rest to its
//! children.
//!
//! Supported segments:
//! - `users` - static text, must match exactly (case-sensitive)
//! - `:id` - binds one segment to the parameter `id`
//! - `*` - binds every remaining segment to the parameter `splat`
//!
//! A remainder made only of slashes counts as fully consumed, so `/users/`
//! matches `users`. The same rule makes `/` consume an empty path, so a `/`
//! root is terminal for both `""` and `"/"`.

use crate::params::RouteParams;

/// Name of the parameter bound by a `*` segment
pub const SPLAT_PARAM: &str = "splat";

/// Outcome of matching a pattern against a remaining path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    /// Unconsumed suffix, `None` on mismatch. Empty when fully consumed.
    pub remaining_pathname: Option<String>,
    /// Names bound at this step, parallel to `param_values`
    pub param_names: Vec<String>,
    /// Values bound at this step, parallel to `param_names`
    pub param_values: Vec<String>,
}

impl PatternMatch {
    fn mismatch() -> Self {
        Self {
            remaining_pathname: None,
            param_names: Vec::new(),
            param_values: Vec::new(),
        }
    }

    /// Whether the pattern matched
    pub fn is_match(&self) -> bool {
        self.remaining_pathname.is_some()
    }
}

/// A single segment in a route pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Static text that must match exactly
    Static(String),
    /// Parameter that captures one segment
    Param(String),
    /// Captures the rest of the path
    Splat,
}

impl Segment {
    /// Parse a segment from string
    ///
    /// Examples:
    /// - "users" -> Static("users")
    /// - ":id" -> Param("id")
    /// - "*" -> Splat
    pub fn parse(s: &str) -> Self {
        if s == "*" {
            return Segment::Splat;
        }

        match s.strip_prefix(':') {
            Some(name) => Segment::Param(name.to_string()),
            None => Segment::Static(s.to_string()),
        }
    }
}

/// A parsed route pattern
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoutePattern {
    segments: Vec<Segment>,
}

impl RoutePattern {
    /// Parse a pattern, ignoring leading, trailing and repeated slashes
    pub fn parse(pattern: &str) -> Self {
        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(Segment::parse)
            .collect();

        Self { segments }
    }

    /// Match this pattern against the front of `remaining`
    pub fn match_prefix(&self, remaining: &str) -> PatternMatch {
        let mut rest = remaining;
        let mut param_names = Vec::new();
        let mut param_values = Vec::new();

        for segment in &self.segments {
            match segment {
                Segment::Static(expected) => match split_segment(rest) {
                    Some((actual, tail)) if actual == expected => rest = tail,
                    _ => return PatternMatch::mismatch(),
                },
                Segment::Param(name) => match split_segment(rest) {
                    Some((actual, tail)) => {
                        param_names.push(name.clone());
                        param_values.push(actual.to_string());
                        rest = tail;
                    }
                    None => return PatternMatch::mismatch(),
                },
                Segment::Splat => {
                    let captured: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
                    param_names.push(SPLAT_PARAM.to_string());
                    param_values.push(captured.join("/"));
                    rest = "";
                }
            }
        }

        // A suffix made only of slashes counts as fully consumed.
        let remaining_pathname = if rest.trim_matches('/').is_empty() {
            String::new()
        } else {
            rest.to_string()
        };

        PatternMatch {
            remaining_pathname: Some(remaining_pathname),
            param_names,
            param_values,
        }
    }
}

/// Split the first non-empty segment off `path`.
///
/// The returned tail is empty or starts with `/`.
fn split_segment(path: &str) -> Option<(&str, &str)> {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() {
        return None;
    }

    let end = trimmed.find('/').unwrap_or(trimmed.len());
    Some(trimmed.split_at(end))
}

/// Match `pattern` against the front of `remaining_pathname`.
///
/// An empty pattern consumes nothing and hands the input back unchanged.
///
/// # Example
///
/// ```
/// use route_traverser::match_pattern;
///
/// let matched = match_pattern("/users/:id", "/users/42/posts");
/// assert_eq!(matched.remaining_pathname.as_deref(), Some("/posts"));
/// assert_eq!(matched.param_names, ["id"]);
/// assert_eq!(matched.param_values, ["42"]);
///
/// assert!(!match_pattern("/users", "/people").is_match());
/// ```
pub fn match_pattern(pattern: &str, remaining_pathname: &str) -> PatternMatch {
    if pattern.is_empty() {
        return PatternMatch {
            remaining_pathname: Some(remaining_pathname.to_string()),
            param_names: Vec::new(),
            param_values: Vec::new(),
        };
    }

    RoutePattern::parse(pattern).match_prefix(remaining_pathname)
}

/// Zip accumulated parameter names and values into `RouteParams`.
///
/// Later (deeper) occurrences of a name overwrite earlier ones.
pub fn make_params(names: &[String], values: &[String]) -> RouteParams {
    names
        .iter()
        .zip(values)
        .map(|(name, value)| (name.as_str(), value.as_str()))
        .collect()
}
