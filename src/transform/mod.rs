//! Transformation & aggregation pipeline
//!
//! Each declared [`TransformConfig`] node is interpreted by [`apply`], a pure
//! function from one JSON value to the next. Nodes that need rows first
//! coerce their input with [`coerce_rows`].

pub mod aggregate;
pub mod ast;
pub mod filter;
pub mod sort;

use serde_json::Value;
use std::collections::BTreeMap;

use crate::engine::path::lookup_or_null;
use crate::error::EngineResult;

pub use aggregate::{aggregate, AggregateOutput};
pub use ast::{
    AggregationSpec, FilterOperator, FilterPredicate, MetricFunction, MetricSpec, SortDirection,
    SortKey, TransformConfig,
};

/// Keys searched, in order, for a nested row array inside an object payload.
/// `results` and `issues` follow tracker conventions; `data` is what an
/// aggregate step emits, so aggregates compose.
const NESTED_ROW_KEYS: [&str; 3] = ["results", "issues", "data"];

/// Coerce a payload into rows: arrays as-is, a nested row array when the
/// payload is an object carrying one, `null` as no rows, anything else as a
/// single row.
pub fn coerce_rows(input: Value) -> Vec<Value> {
    match input {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        Value::Object(mut map) => {
            let key = NESTED_ROW_KEYS
                .iter()
                .find(|k| map.get(**k).is_some_and(Value::is_array));
            match key.and_then(|k| map.remove(*k)) {
                Some(Value::Array(items)) => items,
                _ => vec![Value::Object(map)],
            }
        }
        other => vec![other],
    }
}

/// Number of records a payload represents
pub fn record_count(value: &Value) -> usize {
    match value {
        Value::Null => 0,
        Value::Array(items) => items.len(),
        Value::Object(map) => NESTED_ROW_KEYS
            .iter()
            .find_map(|k| map.get(*k).and_then(Value::as_array))
            .map_or(1, Vec::len),
        _ => 1,
    }
}

/// Numeric view of a value; numeric strings count as numbers
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Text view used for string comparisons and grouping keys
pub fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// JSON number for a computed float, integral values rendered as integers
pub fn number_value(value: f64) -> Value {
    const MAX_SAFE: f64 = 9_007_199_254_740_991.0;
    if value.is_finite() && value.fract() == 0.0 && value.abs() <= MAX_SAFE {
        Value::from(value as i64)
    } else {
        serde_json::Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

fn project(row: &Value, fields: &BTreeMap<String, String>) -> Value {
    let projected = fields
        .iter()
        .map(|(target, source)| (target.clone(), lookup_or_null(row, source)))
        .collect();
    Value::Object(projected)
}

/// Apply one transform node
pub fn apply(transform: &TransformConfig, input: Value) -> EngineResult<Value> {
    match transform {
        TransformConfig::Filter { conditions } => Ok(Value::Array(filter::filter_rows(
            coerce_rows(input),
            conditions,
        ))),
        TransformConfig::Map { fields } => Ok(Value::Array(
            coerce_rows(input)
                .iter()
                .map(|row| project(row, fields))
                .collect(),
        )),
        TransformConfig::Sort { keys } => {
            let mut rows = coerce_rows(input);
            sort::sort_rows(&mut rows, keys);
            Ok(Value::Array(rows))
        }
        TransformConfig::Aggregate(spec) => Ok(aggregate(input, spec)?.into_value()),
    }
}

/// Apply transform nodes in order
pub fn apply_pipeline<'a, I>(steps: I, input: Value) -> EngineResult<Value>
where
    I: IntoIterator<Item = &'a TransformConfig>,
{
    steps
        .into_iter()
        .try_fold(input, |value, step| apply(step, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_rows() {
        assert_eq!(coerce_rows(json!([1, 2])).len(), 2);
        assert_eq!(coerce_rows(json!({"issues": [1, 2, 3], "total": 3})).len(), 3);
        assert_eq!(coerce_rows(json!({"results": [1]})), vec![json!(1)]);
        assert_eq!(coerce_rows(json!({"id": 7})), vec![json!({"id": 7})]);
        assert!(coerce_rows(Value::Null).is_empty());
    }

    #[test]
    fn test_record_count() {
        assert_eq!(record_count(&json!([1, 2, 3])), 3);
        assert_eq!(record_count(&json!({"data": [1, 2], "metadata": {}})), 2);
        assert_eq!(record_count(&json!({"id": 1})), 1);
        assert_eq!(record_count(&Value::Null), 0);
    }

    #[test]
    fn test_number_value() {
        assert_eq!(number_value(3.0), json!(3));
        assert_eq!(number_value(2.5), json!(2.5));
        assert_eq!(number_value(f64::NAN), Value::Null);
    }

    #[test]
    fn test_map_projects_paths() {
        let mut fields = BTreeMap::new();
        fields.insert("key".to_string(), "key".to_string());
        fields.insert("status".to_string(), "fields.status.name".to_string());
        let node = TransformConfig::Map { fields };

        let out = apply(
            &node,
            json!([{"key": "OPS-1", "fields": {"status": {"name": "Open"}, "noise": 1}}]),
        )
        .unwrap();
        assert_eq!(out, json!([{"key": "OPS-1", "status": "Open"}]));
    }

    #[test]
    fn test_pipeline_filter_then_sort() {
        let steps = vec![
            TransformConfig::Filter {
                conditions: vec![FilterPredicate::new(
                    "status",
                    FilterOperator::NotEquals,
                    json!("closed"),
                )],
            },
            TransformConfig::Sort {
                keys: vec![SortKey::desc("points")],
            },
        ];

        let out = apply_pipeline(
            &steps,
            json!({"issues": [
                {"id": 1, "status": "open", "points": 3},
                {"id": 2, "status": "Closed", "points": 8},
                {"id": 3, "status": "pending", "points": 5}
            ]}),
        )
        .unwrap();

        let ids: Vec<i64> = out
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![3, 1]);
    }
}
