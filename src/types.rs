//! Common types used throughout pagewise
//!
//! This module contains shared type definitions and type aliases
//! used across multiple modules.

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// An opaque record returned inside a page.
///
/// The retrieval engine stores, counts and forwards records but never looks
/// inside them.
pub type Record = JsonValue;

/// Ordered query parameters for the first request of a query
pub type QueryParams = Vec<(String, String)>;

// ============================================================================
// Utilities
// ============================================================================

/// Extension trait for Option<String> to handle empty strings
pub trait OptionStringExt {
    /// Returns None if the string is empty
    fn none_if_empty(self) -> Option<String>;
}

impl OptionStringExt for Option<String> {
    fn none_if_empty(self) -> Option<String> {
        self.filter(|s| !s.trim().is_empty())
    }
}

impl OptionStringExt for String {
    fn none_if_empty(self) -> Option<String> {
        if self.trim().is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

/// Walk a dotted path (`a.b.c`, optional `$.` prefix) through nested objects
pub fn value_at_path<'v>(value: &'v JsonValue, path: &str) -> Option<&'v JsonValue> {
    let path = path.strip_prefix("$.").unwrap_or(path);
    path.split('.')
        .filter(|part| !part.is_empty())
        .try_fold(value, |current, part| match current {
            JsonValue::Object(map) => map.get(part),
            _ => None,
        })
}

/// Like [`value_at_path`] but moves the value out, leaving `null` behind
pub fn take_at_path(value: &mut JsonValue, path: &str) -> Option<JsonValue> {
    let path = path.strip_prefix("$.").unwrap_or(path);
    let mut current = value;
    for part in path.split('.').filter(|part| !part.is_empty()) {
        current = match current {
            JsonValue::Object(map) => map.get_mut(part)?,
            _ => return None,
        };
    }
    Some(current.take())
}
