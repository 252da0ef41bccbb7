//! Grouping and metric computation

use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use tracing::warn;

use super::ast::{AggregationSpec, MetricFunction, MetricSpec};
use super::{as_number, as_text, coerce_rows, filter, number_value, sort};
use crate::engine::path::{lookup, lookup_or_null};
use crate::error::{EngineResult, QueryError};

/// Separator `concat` uses when none is declared
pub const DEFAULT_CONCAT_SEPARATOR: &str = ", ";

/// Aggregated rows plus what was done to produce them
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateOutput {
    pub rows: Vec<Value>,
    pub group_by: Vec<String>,
    pub metrics: Vec<String>,
    pub original_count: usize,
    pub processed_count: usize,
}

impl AggregateOutput {
    pub fn into_value(self) -> Value {
        json!({
            "data": self.rows,
            "metadata": {
                "group_by": self.group_by,
                "metrics": self.metrics,
                "original_count": self.original_count,
                "processed_count": self.processed_count,
            }
        })
    }
}

/// Reject specs that cannot be evaluated
pub fn validate(spec: &AggregationSpec) -> EngineResult<()> {
    if let Some(field) = spec.group_by.iter().find(|f| f.is_empty()) {
        return Err(QueryError::Validation(format!(
            "aggregation group_by contains an empty field name: {:?}",
            field
        )));
    }
    for metric in &spec.metrics {
        let has_field = metric.field.as_deref().is_some_and(|f| !f.is_empty());
        if metric.function.requires_field() && !has_field {
            return Err(QueryError::Validation(format!(
                "aggregation metric '{}' requires a field",
                metric.function.as_str()
            )));
        }
    }
    Ok(())
}

fn numeric_values(rows: &[&Value], field: &str) -> Vec<f64> {
    rows.iter()
        .filter_map(|row| lookup(row, field).and_then(as_number))
        .collect()
}

/// Mean of `values`; 0 for an empty set
pub fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Middle value, or the mean of the two middle values for even lengths
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Evaluate one metric over a bucket
pub fn compute_metric(rows: &[&Value], metric: &MetricSpec) -> Value {
    let field = metric.field.as_deref().unwrap_or("");

    match metric.function {
        MetricFunction::Count => {
            if field.is_empty() {
                Value::from(rows.len())
            } else {
                let present = rows
                    .iter()
                    .filter(|row| lookup(row, field).is_some_and(|v| !v.is_null()))
                    .count();
                Value::from(present)
            }
        }
        MetricFunction::CountDistinct => {
            let distinct: HashSet<String> = rows
                .iter()
                .filter_map(|row| lookup(row, field))
                .filter(|v| !v.is_null())
                .map(Value::to_string)
                .collect();
            Value::from(distinct.len())
        }
        MetricFunction::Sum => number_value(numeric_values(rows, field).iter().sum()),
        MetricFunction::Avg => number_value(average(&numeric_values(rows, field))),
        MetricFunction::Min => numeric_values(rows, field)
            .into_iter()
            .reduce(f64::min)
            .map_or(Value::Null, number_value),
        MetricFunction::Max => numeric_values(rows, field)
            .into_iter()
            .reduce(f64::max)
            .map_or(Value::Null, number_value),
        MetricFunction::Median => {
            median(&numeric_values(rows, field)).map_or(Value::Null, number_value)
        }
        MetricFunction::Concat => {
            let separator = metric
                .separator
                .as_deref()
                .unwrap_or(DEFAULT_CONCAT_SEPARATOR);
            let parts: Vec<String> = rows
                .iter()
                .filter_map(|row| lookup(row, field))
                .filter(|v| !v.is_null())
                .map(as_text)
                .collect();
            Value::String(parts.join(separator))
        }
        MetricFunction::Unknown => {
            warn!(
                metric = %metric.output_name(),
                field = %field,
                "Unknown aggregation function, emitting null"
            );
            Value::Null
        }
    }
}

/// Group rows by the joined tuple of `group_by` values, in first-seen order
fn bucket<'a>(rows: &'a [Value], group_by: &[String]) -> Vec<Vec<&'a Value>> {
    if group_by.is_empty() {
        return vec![rows.iter().collect()];
    }

    let mut index: HashMap<String, usize> = HashMap::new();
    let mut buckets: Vec<Vec<&Value>> = Vec::new();
    for row in rows {
        let key = group_by
            .iter()
            .map(|field| as_text(&lookup_or_null(row, field)))
            .collect::<Vec<_>>()
            .join("|");
        match index.get(&key) {
            Some(&i) => buckets[i].push(row),
            None => {
                index.insert(key, buckets.len());
                buckets.push(vec![row]);
            }
        }
    }
    buckets
}

/// Run an aggregation spec over a payload.
///
/// With neither `group_by` nor metrics the filtered rows pass through, so
/// re-aggregating an aggregated result keeps its row count.
pub fn aggregate(input: Value, spec: &AggregationSpec) -> EngineResult<AggregateOutput> {
    validate(spec)?;

    let rows = coerce_rows(input);
    let original_count = rows.len();
    let rows = filter::filter_rows(rows, &spec.filters);

    let mut output: Vec<Value> = if spec.group_by.is_empty() && spec.metrics.is_empty() {
        rows
    } else {
        bucket(&rows, &spec.group_by)
            .into_iter()
            .map(|members| {
                let mut out = Map::new();
                if let Some(first) = members.first() {
                    for field in &spec.group_by {
                        out.insert(field.clone(), lookup_or_null(first, field));
                    }
                }
                for metric in &spec.metrics {
                    out.insert(metric.output_name(), compute_metric(&members, metric));
                }
                Value::Object(out)
            })
            .collect()
    };

    sort::sort_rows(&mut output, &spec.sort);
    if let Some(limit) = spec.limit {
        output.truncate(limit);
    }

    Ok(AggregateOutput {
        processed_count: output.len(),
        rows: output,
        group_by: spec.group_by.clone(),
        metrics: spec.metrics.iter().map(MetricSpec::output_name).collect(),
        original_count,
    })
}
