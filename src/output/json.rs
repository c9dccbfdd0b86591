//! JSON serialization for results and reports.

use serde::Serialize;

/// Serialize a [`BumpReport`](crate::BumpReport), [`CombinedResult`](crate::CombinedResult)
/// or [`Config`](crate::Config) to a compact JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails. Non-finite floats are written as `null`.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(value)
}

/// Serialize a value to a pretty-printed JSON string.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_json_pretty<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}
