//! Structural matching of JSON messages against path expectations.
//!
//! A message matches an [`ExpectationSet`] when every `path -> expected` pair
//! holds. Pairs are checked in insertion order and the first failing pair ends
//! the evaluation.
//!
//! # Module Structure
//!
//! - `path` - path normalisation, parsing and the tree walk over `serde_json::Value`
//! - `expectation` - expectation sets and expected-value classification
//! - `evaluate` - the match itself, including type coercion
//!
//! Malformed messages and malformed paths never escape [`matches`]; they are
//! logged at debug level and count as a non-match. [`evaluate`] exposes them.

mod evaluate;
mod expectation;
mod path;

pub use evaluate::{evaluate, evaluate_value, matches, matches_value, MatchError};
pub use expectation::{CompiledExpectation, ExpectationSet, ExpectedValue};
pub(crate) use expectation::NUMERAL;
pub use path::{normalize_path, resolve, JsonPath, PathSegment};
