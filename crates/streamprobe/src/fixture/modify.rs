//! Path-based modification of JSON documents.

use super::FixtureError;
use crate::matcher::{JsonPath, MatchError, PathSegment, NUMERAL};
use serde_json::{Number, Value};
use tracing::{debug, error};

/// Turn a data-table cell into the JSON value it stands for.
///
/// - missing cell, `null`, `<null>`, `${null}` (any case) -> `null`
/// - empty string -> `""`
/// - numerals with a fractional part -> float, without -> integer
/// - `true` / `false` (any case) -> boolean
/// - anything else -> string
pub fn coerce_value(raw: Option<&str>) -> Value {
    let Some(raw) = raw else {
        return Value::Null;
    };

    if ["null", "<null>", "${null}"]
        .iter()
        .any(|marker| raw.eq_ignore_ascii_case(marker))
    {
        return Value::Null;
    }
    if raw.is_empty() {
        return Value::String(String::new());
    }
    if NUMERAL.is_match(raw) {
        if !raw.contains('.') {
            if let Ok(integer) = raw.parse::<i64>() {
                return Value::from(integer);
            }
        }
        if let Some(number) = raw.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(number);
        }
    }
    if raw.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    Value::String(raw.to_string())
}

/// Replace the node at `path` with `value`.
///
/// Every segment but the last must already exist. The last segment may add a
/// new key to an existing object, but an array index must be in bounds.
pub fn set_path(document: &mut Value, path: &str, value: Value) -> Result<(), FixtureError> {
    let parsed = JsonPath::parse(path).map_err(|e| match e {
        MatchError::MalformedPath { path, reason } => FixtureError::InvalidPath { path, reason },
        other => FixtureError::InvalidPath {
            path: path.to_string(),
            reason: other.to_string(),
        },
    })?;

    let Some((last, parents)) = parsed.segments().split_last() else {
        *document = value;
        return Ok(());
    };

    let not_found = || FixtureError::PathNotFound(path.to_string());

    let parent = parents
        .iter()
        .try_fold(document, |node, segment| match segment {
            PathSegment::Field(name) => node.as_object_mut()?.get_mut(name),
            PathSegment::Index(index) => node.as_array_mut()?.get_mut(*index),
        })
        .ok_or_else(not_found)?;

    match last {
        PathSegment::Field(name) => {
            parent
                .as_object_mut()
                .ok_or_else(not_found)?
                .insert(name.clone(), value);
        }
        PathSegment::Index(index) => {
            let slot = parent
                .as_array_mut()
                .and_then(|items| items.get_mut(*index))
                .ok_or_else(not_found)?;
            *slot = value;
        }
    }
    Ok(())
}

/// Parse `json`, apply each `path -> raw value` pair in order, and serialise
/// the result.
pub fn apply_modifications<I, P, V>(json: &str, modifications: I) -> Result<String, FixtureError>
where
    I: IntoIterator<Item = (P, V)>,
    P: AsRef<str>,
    V: AsRef<str>,
{
    let mut document: Value = serde_json::from_str(json)?;

    for (path, raw) in modifications {
        let (path, raw) = (path.as_ref(), raw.as_ref());
        set_path(&mut document, path, coerce_value(Some(raw))).map_err(|e| {
            error!("Error updating JSON value for path: {}, value: {}", path, raw);
            e
        })?;
        debug!("Set {} to {}", path, raw);
    }

    Ok(serde_json::to_string(&document)?)
}
