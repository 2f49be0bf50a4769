//! Expectation sets: `path -> expected value` constraints for a single wait.

use super::evaluate::MatchError;
use super::path::JsonPath;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Signed integer or decimal numeral, e.g. `5`, `-12`, `3.25`.
pub(crate) static NUMERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("numeral pattern is a valid regex"));

/// Sentinel that expects an absent or null value, alongside `null` in any case.
pub const NULL_SENTINEL: &str = "<null>";

/// How an expected string is compared against the value found in a message.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpectedValue {
    /// `null` (any case) or `<null>`: the path must be absent or null
    Null,
    /// Numeral: compared as `f64`, so `5` equals `5.0`
    Number(f64),
    /// `true` / `false` (any case)
    Boolean(bool),
    /// Anything else: exact string comparison
    Text(String),
}

impl ExpectedValue {
    /// Classify an expected string. Order matters: null, numeral, boolean, text.
    pub fn classify(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("null") || raw == NULL_SENTINEL {
            return ExpectedValue::Null;
        }
        if NUMERAL.is_match(raw) {
            if let Ok(number) = raw.parse::<f64>() {
                return ExpectedValue::Number(number);
            }
        }
        if raw.eq_ignore_ascii_case("true") {
            return ExpectedValue::Boolean(true);
        }
        if raw.eq_ignore_ascii_case("false") {
            return ExpectedValue::Boolean(false);
        }
        ExpectedValue::Text(raw.to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ExpectedValue::Null)
    }
}

/// A single expectation with its path parsed up front.
///
/// A malformed path is kept as an error rather than rejected, so that it turns
/// into a non-match when evaluated instead of aborting set construction.
#[derive(Debug, Clone)]
pub struct CompiledExpectation {
    raw_path: String,
    raw_expected: String,
    path: Result<JsonPath, MatchError>,
    expected: ExpectedValue,
}

impl CompiledExpectation {
    pub fn compile(path: impl Into<String>, expected: impl Into<String>) -> Self {
        let raw_path = path.into();
        let raw_expected = expected.into();
        Self {
            path: JsonPath::parse(&raw_path),
            expected: ExpectedValue::classify(&raw_expected),
            raw_path,
            raw_expected,
        }
    }

    /// The path as supplied by the caller.
    pub fn raw_path(&self) -> &str {
        &self.raw_path
    }

    /// The expected value as supplied by the caller.
    pub fn raw_expected(&self) -> &str {
        &self.raw_expected
    }

    pub fn path(&self) -> Result<&JsonPath, MatchError> {
        self.path.as_ref().map_err(Clone::clone)
    }

    pub fn expected(&self) -> &ExpectedValue {
        &self.expected
    }
}

/// The constraints a message must satisfy, evaluated in insertion order.
///
/// Inserting a path that is already present replaces its expected value and
/// keeps its original position.
#[derive(Debug, Clone, Default)]
pub struct ExpectationSet {
    entries: Vec<CompiledExpectation>,
}

impl ExpectationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, path: impl Into<String>, expected: impl Into<String>) -> Self {
        self.insert(path, expected);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, expected: impl Into<String>) {
        let compiled = CompiledExpectation::compile(path, expected);
        match self
            .entries
            .iter_mut()
            .find(|existing| existing.raw_path == compiled.raw_path)
        {
            Some(existing) => *existing = compiled,
            None => self.entries.push(compiled),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompiledExpectation> {
        self.entries.iter()
    }
}

impl<P, V> FromIterator<(P, V)> for ExpectationSet
where
    P: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (P, V)>>(iter: I) -> Self {
        let mut set = ExpectationSet::new();
        for (path, expected) in iter {
            set.insert(path, expected);
        }
        set
    }
}

impl fmt::Display for ExpectationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", entry.raw_path, entry.raw_expected)?;
        }
        f.write_str("}")
    }
}
