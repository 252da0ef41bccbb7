//! Row predicates

use serde_json::Value;
use std::cmp::Ordering;

use super::ast::{FilterOperator, FilterPredicate};
use super::{as_number, as_text};
use crate::engine::path::lookup;

/// Loose equality: numbers numerically, strings case-insensitively, mixed
/// scalars through their text form.
fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::String(a), Value::String(b)) => a.to_lowercase() == b.to_lowercase(),
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => {
            left == right
        }
        _ => as_text(left).to_lowercase() == as_text(right).to_lowercase(),
    }
}

/// Ordering for range operators: numeric when both sides are numeric,
/// case-insensitive text when both are strings, otherwise incomparable.
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (as_number(left), as_number(right)) {
        return a.partial_cmp(&b);
    }
    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.to_lowercase().cmp(&b.to_lowercase())),
        _ => None,
    }
}

fn text_test(field: &Value, value: &Value, test: impl Fn(&str, &str) -> bool) -> bool {
    if field.is_null() || value.is_null() {
        return false;
    }
    test(&as_text(field).to_lowercase(), &as_text(value).to_lowercase())
}

fn member_of(field: &Value, value: &Value) -> bool {
    match value {
        Value::Array(candidates) => candidates.iter().any(|c| loose_eq(field, c)),
        single => loose_eq(field, single),
    }
}

/// Evaluate one predicate against a row. Missing fields read as `null`.
pub fn matches(row: &Value, predicate: &FilterPredicate) -> bool {
    let null = Value::Null;
    let field = lookup(row, &predicate.field).unwrap_or(&null);
    let value = &predicate.value;

    match predicate.operator {
        FilterOperator::Equals => loose_eq(field, value),
        FilterOperator::NotEquals => !loose_eq(field, value),
        FilterOperator::Contains => match field {
            Value::Array(items) => items.iter().any(|item| loose_eq(item, value)),
            _ => text_test(field, value, |f, v| f.contains(v)),
        },
        FilterOperator::StartsWith => text_test(field, value, |f, v| f.starts_with(v)),
        FilterOperator::EndsWith => text_test(field, value, |f, v| f.ends_with(v)),
        FilterOperator::GreaterThan => compare(field, value) == Some(Ordering::Greater),
        FilterOperator::LessThan => compare(field, value) == Some(Ordering::Less),
        FilterOperator::GreaterEqual => {
            matches!(compare(field, value), Some(Ordering::Greater | Ordering::Equal))
        }
        FilterOperator::LessEqual => {
            matches!(compare(field, value), Some(Ordering::Less | Ordering::Equal))
        }
        FilterOperator::In => member_of(field, value),
        FilterOperator::NotIn => !member_of(field, value),
        FilterOperator::IsNull => field.is_null(),
        FilterOperator::IsNotNull => !field.is_null(),
    }
}

pub fn matches_all(row: &Value, predicates: &[FilterPredicate]) -> bool {
    predicates.iter().all(|p| matches(row, p))
}

/// Keep rows satisfying every predicate
pub fn filter_rows(rows: Vec<Value>, predicates: &[FilterPredicate]) -> Vec<Value> {
    if predicates.is_empty() {
        return rows;
    }
    rows.into_iter()
        .filter(|row| matches_all(row, predicates))
        .collect()
}
