//! Schema Inference
//!
//! Guesses a column type per header from the first few parsed rows.
//! Number beats date when a sample satisfies both ("2024" is a number).

use crate::row::RawRow;
use crate::schema::ColumnDefinition;
use crate::value::{ColumnType, RawValue};

/// Number of leading rows inspected per column.
///
/// More rows would improve accuracy at the cost of latency. Changing this
/// changes observable inference results.
pub const INFERENCE_SAMPLE_ROWS: usize = 5;

/// Infer a type from a column's sample values.
///
/// Blank cells carry no evidence. A column with no non-blank sample stays text.
pub fn infer_column_type<'a, I>(values: I) -> ColumnType
where
    I: IntoIterator<Item = &'a RawValue>,
{
    let mut is_number = true;
    let mut is_date = true;
    let mut has_value = false;

    for value in values {
        if value.is_blank() {
            continue;
        }
        has_value = true;
        if value.as_number().is_none() {
            is_number = false;
        }
        if value.as_date().is_none() {
            is_date = false;
        }
    }

    if !has_value {
        ColumnType::Text
    } else if is_number {
        ColumnType::Number
    } else if is_date {
        ColumnType::Date
    } else {
        ColumnType::Text
    }
}

/// Infer a candidate schema for `headers` from the first
/// [`INFERENCE_SAMPLE_ROWS`] rows. The result is not validated.
pub fn infer_schema(headers: &[String], rows: &[RawRow]) -> Vec<ColumnDefinition> {
    let sample = &rows[..rows.len().min(INFERENCE_SAMPLE_ROWS)];

    headers
        .iter()
        .map(|header| {
            let column_type = infer_column_type(sample.iter().filter_map(|row| row.get(header)));
            log::debug!("inferred column '{}' as {}", header, column_type);
            ColumnDefinition::new(header.clone(), column_type)
        })
        .collect()
}
