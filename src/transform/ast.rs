//! Typed transform declarations
//!
//! Systems declare named transforms in their configuration; queries reference
//! them by name. Each declaration deserializes into one [`TransformConfig`]
//! node, tagged by `type`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One step of a transformation pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransformConfig {
    /// Keep rows matching every predicate
    Filter {
        #[serde(default)]
        conditions: Vec<FilterPredicate>,
    },
    /// Project rows into `{target: value at source path}`
    Map { fields: BTreeMap<String, String> },
    /// Multi-key sort
    Sort { keys: Vec<SortKey> },
    /// Filter, group, compute metrics, sort and limit
    Aggregate(AggregationSpec),
}

impl TransformConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            TransformConfig::Filter { .. } => "filter",
            TransformConfig::Map { .. } => "map",
            TransformConfig::Sort { .. } => "sort",
            TransformConfig::Aggregate(_) => "aggregate",
        }
    }
}

/// Comparison operators available to filter predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    Contains,
    StartsWith,
    EndsWith,
    GreaterThan,
    LessThan,
    GreaterEqual,
    LessEqual,
    In,
    NotIn,
    IsNull,
    IsNotNull,
}

/// `field <operator> value`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterPredicate {
    /// Dot-path into the row
    pub field: String,
    pub operator: FilterOperator,
    #[serde(default)]
    pub value: Value,
}

impl FilterPredicate {
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    #[serde(alias = "ascending")]
    Asc,
    #[serde(alias = "descending")]
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Aggregation functions
///
/// Unrecognized names deserialize to `Unknown`; evaluating one logs a warning
/// and produces `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricFunction {
    Count,
    CountDistinct,
    Sum,
    Avg,
    Min,
    Max,
    Median,
    Concat,
    #[serde(other)]
    Unknown,
}

impl MetricFunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricFunction::Count => "count",
            MetricFunction::CountDistinct => "count_distinct",
            MetricFunction::Sum => "sum",
            MetricFunction::Avg => "avg",
            MetricFunction::Min => "min",
            MetricFunction::Max => "max",
            MetricFunction::Median => "median",
            MetricFunction::Concat => "concat",
            MetricFunction::Unknown => "unknown",
        }
    }

    /// Whether the function reads a field (everything except a bare `count`)
    pub fn requires_field(&self) -> bool {
        !matches!(self, MetricFunction::Count | MetricFunction::Unknown)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSpec {
    #[serde(default)]
    pub field: Option<String>,
    pub function: MetricFunction,
    #[serde(default)]
    pub alias: Option<String>,
    /// Separator for `concat`, defaults to `", "`
    #[serde(default)]
    pub separator: Option<String>,
}

impl MetricSpec {
    pub fn new(function: MetricFunction, field: Option<&str>) -> Self {
        Self {
            field: field.map(str::to_string),
            function,
            alias: None,
            separator: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Output column name: the alias, else `function_field`, else `function`
    pub fn output_name(&self) -> String {
        match (&self.alias, &self.field) {
            (Some(alias), _) => alias.clone(),
            (None, Some(field)) => format!("{}_{}", self.function.as_str(), field),
            (None, None) => self.function.as_str().to_string(),
        }
    }
}

/// Declarative aggregation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregationSpec {
    #[serde(default, alias = "groupBy")]
    pub group_by: Vec<String>,
    #[serde(default)]
    pub metrics: Vec<MetricSpec>,
    #[serde(default)]
    pub filters: Vec<FilterPredicate>,
    #[serde(default)]
    pub sort: Vec<SortKey>,
    #[serde(default)]
    pub limit: Option<usize>,
}
