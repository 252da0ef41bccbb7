//! Multi-key row sorting

use serde_json::Value;
use std::cmp::Ordering;

use super::as_text;
use super::ast::{SortDirection, SortKey};
use crate::engine::path::lookup;

/// Numbers compare numerically, everything else by text; `null` sorts first.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        _ => as_text(a).cmp(&as_text(b)),
    }
}

/// Compare two rows key by key; ties fall through to the next key
pub fn compare_rows(a: &Value, b: &Value, keys: &[SortKey]) -> Ordering {
    let null = Value::Null;
    for key in keys {
        let left = lookup(a, &key.field).unwrap_or(&null);
        let right = lookup(b, &key.field).unwrap_or(&null);
        let ordering = match key.direction {
            SortDirection::Asc => compare_values(left, right),
            SortDirection::Desc => compare_values(right, left),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Stable in-place sort
pub fn sort_rows(rows: &mut [Value], keys: &[SortKey]) {
    if keys.is_empty() {
        return;
    }
    rows.sort_by(|a, b| compare_rows(a, b, keys));
}
