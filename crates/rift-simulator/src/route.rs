//! Route pattern tokenization.
//!
//! A pattern such as `/Pet/{Kind}/Toy/{Name}` is matched segment by segment
//! against a concrete path. Literal segments compare case-insensitively and
//! yield a [`RouteToken::Resource`]; `{Name}` segments capture the concrete
//! segment verbatim and yield a [`RouteToken::Property`].
//!
//! The resulting token sequence is what the nested store walks, so the shape
//! of the store always mirrors the shape of the registered patterns.

use serde::Serialize;

/// One tokenized path segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RouteToken {
    /// Fixed segment, named by the pattern's literal text.
    Resource { name: String },
    /// Captured segment: `name` is the placeholder, `value` the path text.
    Property { name: String, value: String },
}

impl RouteToken {
    pub fn resource(name: impl Into<String>) -> Self {
        RouteToken::Resource { name: name.into() }
    }

    pub fn property(name: impl Into<String>, value: impl Into<String>) -> Self {
        RouteToken::Property {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Pattern-side name of the segment.
    pub fn name(&self) -> &str {
        match self {
            RouteToken::Resource { name } | RouteToken::Property { name, .. } => name,
        }
    }

    /// Captured value, `None` for fixed segments.
    pub fn value(&self) -> Option<&str> {
        match self {
            RouteToken::Resource { .. } => None,
            RouteToken::Property { value, .. } => Some(value),
        }
    }

    pub fn is_property(&self) -> bool {
        matches!(self, RouteToken::Property { .. })
    }

    /// True when this is a captured segment for the given placeholder name.
    pub fn is_property_named(&self, property: &str) -> bool {
        matches!(self, RouteToken::Property { name, .. } if name.eq_ignore_ascii_case(property))
    }
}

/// Split a path or pattern into segments, ignoring a leading and trailing `/`.
pub fn segments(path: &str) -> Vec<&str> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    }
}

/// Placeholder name of a `{Name}` segment.
pub fn placeholder(segment: &str) -> Option<&str> {
    segment
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .filter(|name| !name.is_empty())
}

/// Tokenize `path` against `pattern`.
///
/// Returns `None` when the segment counts differ or a literal segment does not
/// match. The root path tokenized against the root pattern is `Some(vec![])`.
pub fn tokenize(path: &str, pattern: &str) -> Option<Vec<RouteToken>> {
    let path_parts = segments(path);
    let pattern_parts = segments(pattern);

    if path_parts.len() != pattern_parts.len() {
        return None;
    }

    path_parts
        .iter()
        .zip(pattern_parts.iter())
        .map(|(actual, declared)| match placeholder(declared) {
            Some(name) => Some(RouteToken::property(name, *actual)),
            None if literal_eq(actual, declared) => Some(RouteToken::resource(*declared)),
            None => None,
        })
        .collect()
}

/// Captured `(name, value)` pairs in path order.
pub fn captures(tokens: &[RouteToken]) -> Vec<(&str, &str)> {
    tokens
        .iter()
        .filter_map(|token| match token {
            RouteToken::Property { name, value } => Some((name.as_str(), value.as_str())),
            RouteToken::Resource { .. } => None,
        })
        .collect()
}

/// Tokens for the literal prefix of a pattern, up to its first placeholder.
pub fn literal_prefix(pattern: &str) -> Vec<RouteToken> {
    segments(pattern)
        .into_iter()
        .take_while(|segment| placeholder(segment).is_none())
        .map(RouteToken::resource)
        .collect()
}

fn literal_eq(actual: &str, declared: &str) -> bool {
    actual.eq_ignore_ascii_case(declared) || (!actual.is_ascii() && actual.to_lowercase() == declared.to_lowercase())
}
