//! Step definitions for cucumber tests

pub mod given;
pub mod then;

use cucumber::gherkin::Step;

/// Rows of a two-column `key | value` data table, in order. Steps without a
/// table yield nothing.
pub fn table_pairs(step: &Step) -> Vec<(String, String)> {
    step.table
        .as_ref()
        .map(|table| {
            table
                .rows
                .iter()
                .filter_map(|row| match row.as_slice() {
                    [key, value, ..] => Some((key.trim().to_string(), value.trim().to_string())),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}
