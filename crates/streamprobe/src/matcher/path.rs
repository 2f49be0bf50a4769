//! Path expressions over JSON trees.
//!
//! Supports:
//! - `$` - the document root
//! - `$.field.nested` - field access
//! - `$['field']` / `$["field"]` - bracketed field access (keys with dots or spaces)
//! - `$.items[0]` / `$.items.[0]` - array index
//!
//! A path without the root marker is rooted at the document root, so
//! `order.status` and `$.order.status` address the same node.

use super::evaluate::MatchError;
use serde_json::Value;
use std::fmt;

/// Prefix `$.` onto a path that does not already start with the root marker.
///
/// Idempotent: normalising an already-normalised path returns it unchanged.
pub fn normalize_path(path: &str) -> String {
    if path.starts_with('$') {
        path.to_string()
    } else {
        format!("$.{path}")
    }
}

/// One step of a parsed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

/// A parsed, normalised path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    normalized: String,
    segments: Vec<PathSegment>,
}

impl JsonPath {
    /// Normalise and parse a path expression.
    pub fn parse(path: &str) -> Result<Self, MatchError> {
        let normalized = normalize_path(path);
        let malformed = |reason: &str| MatchError::MalformedPath {
            path: path.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        // normalize_path guarantees the leading '$'
        let mut rest = &normalized[1..];

        while !rest.is_empty() {
            if let Some(after_dot) = rest.strip_prefix('.') {
                // `items.[0]` is accepted as an alias of `items[0]`
                if after_dot.starts_with('[') {
                    rest = after_dot;
                    continue;
                }
                let end = after_dot.find(['.', '[']).unwrap_or(after_dot.len());
                let field = &after_dot[..end];
                if field.is_empty() {
                    return Err(malformed("empty field name"));
                }
                segments.push(PathSegment::Field(field.to_string()));
                rest = &after_dot[end..];
            } else if let Some(after_bracket) = rest.strip_prefix('[') {
                let (segment, remaining) =
                    parse_bracket(after_bracket).ok_or_else(|| malformed("invalid bracket segment"))?;
                segments.push(segment);
                rest = remaining;
            } else {
                return Err(malformed("expected '.' or '[' after the root marker"));
            }
        }

        Ok(Self {
            normalized,
            segments,
        })
    }

    /// The normalised text of this path (always starts with `$`).
    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalized)
    }
}

/// Parse the inside of a `[...]` segment. `input` starts right after `[`.
fn parse_bracket(input: &str) -> Option<(PathSegment, &str)> {
    let quote = input.chars().next()?;
    if quote == '\'' || quote == '"' {
        let body = &input[1..];
        let close = body.find(quote)?;
        let remaining = body[close + 1..].strip_prefix(']')?;
        return Some((PathSegment::Field(body[..close].to_string()), remaining));
    }

    let close = input.find(']')?;
    let index = input[..close].trim().parse::<usize>().ok()?;
    Some((PathSegment::Index(index), &input[close + 1..]))
}

/// Walk `value` along `path`.
///
/// Returns `None` when any segment is absent: a missing key, an index past the
/// end of an array, or a segment applied to a scalar. An explicit JSON `null`
/// at the target is returned as `Some(Value::Null)`.
pub fn resolve<'a>(value: &'a Value, path: &JsonPath) -> Option<&'a Value> {
    path.segments
        .iter()
        .try_fold(value, |node, segment| match segment {
            PathSegment::Field(name) => node.as_object()?.get(name),
            PathSegment::Index(index) => node.as_array()?.get(*index),
        })
}
