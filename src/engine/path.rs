//! Dot-path lookups into JSON values
//!
//! Supports object keys and numeric array indices (`data.issues.0.key`).
//! Anything richer (wildcards, filters, recursive descent) is deliberately not
//! supported.

use serde_json::Value;

/// Resolve `path` inside `value`. An empty path resolves to the value itself.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }

    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Like [`lookup`], but missing paths read as `null`
pub fn lookup_or_null(value: &Value, path: &str) -> Value {
    lookup(value, path).cloned().unwrap_or(Value::Null)
}

/// Extract the payload a method declares. No path returns the response unchanged.
pub fn extract(response: Value, path: Option<&str>) -> Value {
    match path {
        None | Some("") => response,
        Some(path) => lookup_or_null(&response, path),
    }
}
