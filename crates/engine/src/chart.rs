//! Chart Transform - turns a query view into a plottable series
//!
//! Raw mode maps each row to one point. Grouped mode buckets rows by the
//! x-axis value (optionally binned for numeric x) and reduces each bucket
//! to one point. A series never contains holes: missing y values become 0.

use std::cmp::Ordering;

use ordered_float::OrderedFloat;
use rustc_hash::FxHashMap;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::ChartError;
use crate::format::{format_number, json_number};
use crate::row::Row;
use crate::schema::{ColumnDefinition, Schema};
use crate::value::{parse_number, ColumnType};

/// Label for rows whose x value is missing or empty
pub const EMPTY_BUCKET: &str = "Empty";
/// Label for rows whose x value cannot be binned
pub const INVALID_BUCKET: &str = "Invalid";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Bar,
    Line,
    Pie,
}

impl std::str::FromStr for ChartKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bar" => Ok(ChartKind::Bar),
            "line" => Ok(ChartKind::Line),
            "pie" => Ok(ChartKind::Pie),
            other => Err(format!("unknown chart type '{other}' (expected bar, line or pie)")),
        }
    }
}

/// Per-bucket reduction in grouped mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupOp {
    #[default]
    Count,
    Sum,
    Avg,
}

impl std::str::FromStr for GroupOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "count" => Ok(GroupOp::Count),
            "sum" => Ok(GroupOp::Sum),
            "avg" | "average" => Ok(GroupOp::Avg),
            other => Err(format!("unknown group operation '{other}' (expected count, sum or avg)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSpec {
    #[serde(rename = "type", default)]
    pub kind: ChartKind,
    pub x_axis: String,
    pub y_axis: String,
    #[serde(default)]
    pub group_data: bool,
    #[serde(default)]
    pub group_op: GroupOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bin_size: Option<f64>,
}

impl ChartSpec {
    /// Default chart for a schema: first column on x, first numeric column on
    /// y, grouped bar chart counting rows. `None` when nothing is numeric.
    pub fn for_schema(schema: &Schema) -> Option<ChartSpec> {
        let x = schema.columns().first()?;
        let y = schema.numeric_columns().next()?;
        Some(ChartSpec {
            kind: ChartKind::Bar,
            x_axis: x.name.clone(),
            y_axis: y.name.clone(),
            group_data: true,
            group_op: GroupOp::Count,
            bin_size: None,
        })
    }

    fn effective_bin(&self) -> Option<f64> {
        self.bin_size.filter(|b| b.is_finite() && *b > 0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

/// Points plus the axis names they were produced for.
///
/// Serializes as `[{<x_axis>: label, <y_axis>: value}, ...]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub x_axis: String,
    pub y_axis: String,
    pub points: Vec<ChartPoint>,
}

impl ChartSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn point_json(&self, point: &ChartPoint) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert(self.x_axis.clone(), serde_json::Value::String(point.label.clone()));
        map.insert(self.y_axis.clone(), json_number(point.value));
        serde_json::Value::Object(map)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(self.points.iter().map(|p| self.point_json(p)).collect())
    }
}

impl Serialize for ChartSeries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.points.len()))?;
        for point in &self.points {
            seq.serialize_element(&self.point_json(point))?;
        }
        seq.end()
    }
}

/// Build the series for `spec` over an already filtered/sorted view.
pub fn chart_series(rows: &[&Row], schema: &Schema, spec: &ChartSpec) -> Result<ChartSeries, ChartError> {
    if !schema.has_numeric_column() {
        return Err(ChartError::NoNumericData);
    }
    let x_col = schema
        .column(&spec.x_axis)
        .ok_or_else(|| ChartError::UnknownColumn(spec.x_axis.clone()))?;
    let y_col = schema
        .column(&spec.y_axis)
        .ok_or_else(|| ChartError::UnknownColumn(spec.y_axis.clone()))?;
    if y_col.column_type != ColumnType::Number {
        return Err(ChartError::NotNumeric(spec.y_axis.clone()));
    }

    let points = if spec.group_data {
        let bin = match x_col.column_type {
            ColumnType::Number => spec.effective_bin(),
            _ => None,
        };
        grouped_points(rows, x_col, y_col, spec.group_op, bin)
    } else {
        rows.iter()
            .map(|row| ChartPoint {
                label: row.cell(x_col).display(),
                value: row.cell(y_col).as_number().unwrap_or(0.0),
            })
            .collect()
    };

    Ok(ChartSeries {
        x_axis: spec.x_axis.clone(),
        y_axis: spec.y_axis.clone(),
        points,
    })
}

#[derive(Default)]
struct Bucket {
    rows: usize,
    values: Vec<f64>,
}

fn grouped_points(
    rows: &[&Row],
    x_col: &ColumnDefinition,
    y_col: &ColumnDefinition,
    op: GroupOp,
    bin: Option<f64>,
) -> Vec<ChartPoint> {
    let mut buckets: FxHashMap<String, Bucket> = FxHashMap::default();

    for row in rows {
        let x = row.cell(x_col);
        let key = match bin {
            Some(size) => match x.as_number() {
                Some(n) => bin_label(n, size),
                None => INVALID_BUCKET.to_string(),
            },
            None => {
                let text = x.display();
                if text.is_empty() {
                    EMPTY_BUCKET.to_string()
                } else {
                    text
                }
            }
        };
        let bucket = buckets.entry(key).or_default();
        bucket.rows += 1;
        if let Some(y) = row.cell(y_col).as_number() {
            bucket.values.push(y);
        }
    }

    log::debug!("grouped {} rows into {} buckets", rows.len(), buckets.len());

    let mut points: Vec<ChartPoint> = buckets
        .into_iter()
        .map(|(label, bucket)| {
            let total: f64 = bucket.values.iter().sum();
            let value = match op {
                GroupOp::Count => bucket.rows as f64,
                GroupOp::Sum => total,
                GroupOp::Avg if bucket.values.is_empty() => 0.0,
                GroupOp::Avg => total / bucket.values.len() as f64,
            };
            ChartPoint { label, value }
        })
        .collect();

    points.sort_by(|a, b| compare_bucket_labels(&a.label, &b.label));
    points
}

fn bin_label(n: f64, size: f64) -> String {
    let start = (n / size).floor() * size;
    format!("{} - {}", format_number(start), format_number(start + size))
}

/// Numeric position of a bucket label: the bin start for `"a - b"`
/// labels, otherwise the whole label read as a number.
fn bucket_position(label: &str) -> Option<f64> {
    let head = label.split_once(" - ").map(|(start, _)| start).unwrap_or(label);
    parse_number(head)
}

/// Numeric labels first in ascending order, then the rest lexicographically.
fn compare_bucket_labels(a: &str, b: &str) -> Ordering {
    match (bucket_position(a), bucket_position(b)) {
        (Some(x), Some(y)) => OrderedFloat(x).cmp(&OrderedFloat(y)).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}
