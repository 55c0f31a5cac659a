//! Query Engine - filter, sort and aggregate over a row snapshot
//!
//! Key invariants:
//! - Every operation reads an immutable snapshot and returns a new view
//! - Filter preserves order; sort is stable
//! - A clause naming a column absent from the schema is ignored, not an error
//! - Aggregate reads the filtered view (sorting does not affect it)

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::row::{Dataset, Row};
use crate::schema::Schema;
use crate::value::{compare, parse_date, parse_number, ColumnType, SortDirection};

// =============================================================================
// Filter operators
// =============================================================================

/// Filter comparison operator. Which ones apply depends on the column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOperator {
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "equals")]
    Equals,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "before")]
    Before,
    #[serde(rename = "after")]
    After,
    #[serde(rename = "on")]
    On,
}

const TEXT_OPERATORS: &[FilterOperator] = &[FilterOperator::Contains, FilterOperator::Equals];
const NUMBER_OPERATORS: &[FilterOperator] = &[
    FilterOperator::Equals,
    FilterOperator::Gt,
    FilterOperator::Gte,
    FilterOperator::Lt,
    FilterOperator::Lte,
];
const DATE_OPERATORS: &[FilterOperator] = &[FilterOperator::On, FilterOperator::Before, FilterOperator::After];

impl FilterOperator {
    /// Operators offered for a column type, in menu order
    pub fn applicable(column_type: ColumnType) -> &'static [FilterOperator] {
        match column_type {
            ColumnType::Text => TEXT_OPERATORS,
            ColumnType::Number => NUMBER_OPERATORS,
            ColumnType::Date => DATE_OPERATORS,
        }
    }

    /// Operator preselected when a column of this type is chosen
    pub fn default_for(column_type: ColumnType) -> FilterOperator {
        match column_type {
            ColumnType::Text => FilterOperator::Contains,
            ColumnType::Number => FilterOperator::Gte,
            ColumnType::Date => FilterOperator::After,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Contains => "contains",
            FilterOperator::Equals => "equals",
            FilterOperator::Gt => ">",
            FilterOperator::Gte => ">=",
            FilterOperator::Lt => "<",
            FilterOperator::Lte => "<=",
            FilterOperator::Before => "before",
            FilterOperator::After => "after",
            FilterOperator::On => "on",
        }
    }

    /// Menu label. Equality on numbers shows as `=`.
    pub fn label(&self, column_type: ColumnType) -> &'static str {
        match (self, column_type) {
            (FilterOperator::Equals, ColumnType::Number) => "=",
            (FilterOperator::Equals, _) => "Equals",
            (FilterOperator::Contains, _) => "Contains",
            (FilterOperator::Gt, _) => ">",
            (FilterOperator::Gte, _) => "≥",
            (FilterOperator::Lt, _) => "<",
            (FilterOperator::Lte, _) => "≤",
            (FilterOperator::Before, _) => "Before",
            (FilterOperator::After, _) => "After",
            (FilterOperator::On, _) => "On",
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "contains" => Ok(FilterOperator::Contains),
            "equals" | "=" | "==" => Ok(FilterOperator::Equals),
            ">" | "gt" => Ok(FilterOperator::Gt),
            ">=" | "gte" => Ok(FilterOperator::Gte),
            "<" | "lt" => Ok(FilterOperator::Lt),
            "<=" | "lte" => Ok(FilterOperator::Lte),
            "before" => Ok(FilterOperator::Before),
            "after" => Ok(FilterOperator::After),
            "on" => Ok(FilterOperator::On),
            other => Err(format!("unknown filter operator '{other}'")),
        }
    }
}

// =============================================================================
// Query clauses
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub column: String,
    pub operator: FilterOperator,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sort {
    pub column: String,
    #[serde(default)]
    pub direction: SortDirection,
}

/// Single-value summary operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateOp {
    #[default]
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl FromStr for AggregateOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "count" => Ok(AggregateOp::Count),
            "sum" => Ok(AggregateOp::Sum),
            "avg" | "average" | "mean" => Ok(AggregateOp::Avg),
            "min" => Ok(AggregateOp::Min),
            "max" => Ok(AggregateOp::Max),
            other => Err(format!("unknown aggregate '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Aggregate {
    pub op: AggregateOp,
    #[serde(default)]
    pub column: Option<String>,
}

/// Filter, sort and aggregate selections for one view
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuerySpec {
    #[serde(default)]
    pub filter: Option<Filter>,
    #[serde(default)]
    pub sort: Option<Sort>,
    #[serde(default)]
    pub aggregate: Aggregate,
}

/// Result of running a `QuerySpec`: the visible rows and the summary value
#[derive(Debug, Clone)]
pub struct QueryView<'a> {
    pub rows: Vec<&'a Row>,
    pub aggregate: Option<f64>,
}

impl QuerySpec {
    /// Filter, then aggregate the filtered view, then sort it.
    pub fn run<'a>(&self, dataset: &'a Dataset) -> QueryView<'a> {
        let schema = dataset.schema();
        let all: Vec<&Row> = dataset.rows().iter().collect();

        let filtered = match &self.filter {
            Some(f) => filter_rows(&all, schema, &f.column, f.operator, &f.value),
            None => all,
        };

        let aggregate = aggregate_rows(&filtered, schema, self.aggregate.op, self.aggregate.column.as_deref());

        let rows = match &self.sort {
            Some(s) => sort_rows(&filtered, schema, &s.column, s.direction),
            None => filtered,
        };

        QueryView { rows, aggregate }
    }
}

// =============================================================================
// Filter
// =============================================================================

/// Keep rows matching `column operator value`, preserving order.
///
/// An empty/whitespace value, or a column not in the schema, passes every row.
/// Rows whose value (or the filter value) cannot be read as the column's type
/// are excluded.
pub fn filter_rows<'a>(
    rows: &[&'a Row],
    schema: &Schema,
    column: &str,
    operator: FilterOperator,
    value: &str,
) -> Vec<&'a Row> {
    filter_rows_in(rows, schema, column, operator, value, &Local)
}

/// [`filter_rows`] with calendar-day comparison (`on`) evaluated in `tz`.
pub fn filter_rows_in<'a, Tz: TimeZone>(
    rows: &[&'a Row],
    schema: &Schema,
    column: &str,
    operator: FilterOperator,
    value: &str,
    tz: &Tz,
) -> Vec<&'a Row> {
    let target = value.trim();
    let Some(col) = schema.column(column) else {
        return rows.to_vec();
    };
    if target.is_empty() {
        return rows.to_vec();
    }

    match col.column_type {
        ColumnType::Text => {
            let needle = target.to_lowercase();
            rows.iter()
                .copied()
                .filter(|row| {
                    let hay = row.cell(col).display().to_lowercase();
                    match operator {
                        FilterOperator::Equals => hay == needle,
                        _ => hay.contains(&needle),
                    }
                })
                .collect()
        }
        ColumnType::Number => {
            let Some(wanted) = parse_number(target) else {
                return Vec::new();
            };
            rows.iter()
                .copied()
                .filter(|row| match row.cell(col).as_number() {
                    Some(n) => match operator {
                        FilterOperator::Gt => n > wanted,
                        FilterOperator::Gte => n >= wanted,
                        FilterOperator::Lt => n < wanted,
                        FilterOperator::Lte => n <= wanted,
                        _ => n == wanted,
                    },
                    None => false,
                })
                .collect()
        }
        ColumnType::Date => {
            let Some(wanted) = parse_date(target) else {
                return Vec::new();
            };
            rows.iter()
                .copied()
                .filter(|row| match row.cell(col).as_instant() {
                    Some(at) => match operator {
                        FilterOperator::Before => at < wanted,
                        FilterOperator::After => at > wanted,
                        FilterOperator::On => same_calendar_day(&at, &wanted, tz),
                        _ => at >= wanted,
                    },
                    None => false,
                })
                .collect()
        }
    }
}

fn same_calendar_day<Tz: TimeZone>(a: &DateTime<Utc>, b: &DateTime<Utc>, tz: &Tz) -> bool {
    let a = a.with_timezone(tz);
    let b = b.with_timezone(tz);
    a.year() == b.year() && a.month() == b.month() && a.day() == b.day()
}

// =============================================================================
// Sort
// =============================================================================

/// Stable sort by `column`. Nulls go last in both directions.
/// A column not in the schema leaves the order unchanged.
pub fn sort_rows<'a>(rows: &[&'a Row], schema: &Schema, column: &str, direction: SortDirection) -> Vec<&'a Row> {
    let mut sorted = rows.to_vec();
    let Some(col) = schema.column(column) else {
        return sorted;
    };
    sorted.sort_by(|a, b| compare(a.cell(col), b.cell(col), col.column_type, direction));
    sorted
}

// =============================================================================
// Aggregate
// =============================================================================

/// Summarize the view.
///
/// `count` is the row count and never null. Numeric ops require a numeric
/// column and ignore null cells; with no usable values the result is null.
pub fn aggregate_rows(rows: &[&Row], schema: &Schema, op: AggregateOp, column: Option<&str>) -> Option<f64> {
    if op == AggregateOp::Count {
        return Some(rows.len() as f64);
    }

    let col = schema.column(column?)?;
    if col.column_type != ColumnType::Number {
        return None;
    }

    let values: Vec<f64> = rows.iter().filter_map(|row| row.cell(col).as_number()).collect();
    if values.is_empty() {
        return None;
    }

    let total: f64 = values.iter().sum();
    match op {
        AggregateOp::Sum => Some(total),
        AggregateOp::Avg => Some(total / values.len() as f64),
        AggregateOp::Min => values.iter().copied().reduce(f64::min),
        AggregateOp::Max => values.iter().copied().reduce(f64::max),
        AggregateOp::Count => unreachable!("count handled above"),
    }
}
