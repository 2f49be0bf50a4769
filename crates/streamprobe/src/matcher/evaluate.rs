//! Evaluation of an expectation set against a message.

use super::expectation::{CompiledExpectation, ExpectationSet, ExpectedValue};
use super::path::resolve;
use serde_json::Value;
use std::borrow::Cow;
use tracing::debug;

/// Why a message could not be evaluated.
///
/// [`matches`] downgrades every variant to a non-match.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MatchError {
    #[error("message is not valid JSON: {0}")]
    MalformedMessage(String),
    #[error("malformed path '{path}': {reason}")]
    MalformedPath { path: String, reason: String },
    #[error("value '{actual}' at '{path}' cannot be read as {target}")]
    Coercion {
        path: String,
        actual: String,
        target: &'static str,
    },
}

/// Check a raw JSON message against `expectations`.
///
/// Errors are logged at debug level and reported as `false`.
pub fn matches(message: &str, expectations: &ExpectationSet) -> bool {
    match evaluate(message, expectations) {
        Ok(matched) => matched,
        Err(e) => {
            debug!(error = %e, "Treating message as non-matching");
            false
        }
    }
}

/// Check an already decoded JSON tree against `expectations`.
pub fn matches_value(message: &Value, expectations: &ExpectationSet) -> bool {
    match evaluate_value(message, expectations) {
        Ok(matched) => matched,
        Err(e) => {
            debug!(error = %e, "Treating message as non-matching");
            false
        }
    }
}

/// Like [`matches`], but surfaces evaluation errors.
pub fn evaluate(message: &str, expectations: &ExpectationSet) -> Result<bool, MatchError> {
    let tree: Value =
        serde_json::from_str(message).map_err(|e| MatchError::MalformedMessage(e.to_string()))?;
    evaluate_value(&tree, expectations)
}

/// Like [`matches_value`], but surfaces evaluation errors.
pub fn evaluate_value(message: &Value, expectations: &ExpectationSet) -> Result<bool, MatchError> {
    for expectation in expectations.iter() {
        let path = expectation.path()?;
        let actual = resolve(message, path);

        if expectation.expected().is_null() {
            if let Some(found) = actual.filter(|v| !v.is_null()) {
                debug!(
                    path = expectation.raw_path(),
                    actual = %found,
                    "Expected null but found a value"
                );
                return Ok(false);
            }
            continue;
        }

        let Some(found) = actual.filter(|v| !v.is_null()) else {
            debug!(path = expectation.raw_path(), "Path not found in message");
            return Ok(false);
        };

        if !compare(found, expectation)? {
            debug!(
                path = expectation.raw_path(),
                expected = expectation.raw_expected(),
                actual = %found,
                "Value mismatch"
            );
            return Ok(false);
        }
    }
    Ok(true)
}

/// Compare a present, non-null value with a non-null expectation.
fn compare(actual: &Value, expectation: &CompiledExpectation) -> Result<bool, MatchError> {
    let coercion_error = |target: &'static str| MatchError::Coercion {
        path: expectation.raw_path().to_string(),
        actual: actual_text(actual).into_owned(),
        target,
    };

    match expectation.expected() {
        ExpectedValue::Number(expected) => actual_text(actual)
            .trim()
            .parse::<f64>()
            .map(|n| n == *expected)
            .map_err(|_| coercion_error("a number")),
        // anything other than `true` (any case) reads as false
        ExpectedValue::Boolean(expected) => {
            Ok(actual_text(actual).eq_ignore_ascii_case("true") == *expected)
        }
        ExpectedValue::Text(expected) => Ok(actual_text(actual) == expected.as_str()),
        // null expectations are settled before compare is called
        ExpectedValue::Null => Ok(actual.is_null()),
    }
}

/// String form of a JSON value: strings raw, everything else as compact JSON.
fn actual_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s),
        other => Cow::Owned(other.to_string()),
    }
}
