//! Rows and Row Coercion
//!
//! A raw row is whatever ingestion produced: header name -> untyped value.
//! A canonical `Row` holds one coerced `CellValue` per schema column plus an
//! opaque identity that is not part of the schema.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::schema::{validate_schema, ColumnDefinition, Schema};
use crate::value::{coerce, CellValue, RawValue};

/// Untyped row as produced by ingestion
pub type RawRow = HashMap<String, RawValue>;

/// Opaque origin identity of a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowId(pub u64);

/// A canonical row: every schema column holds a value of that column's type
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    id: RowId,
    cells: HashMap<String, CellValue>,
}

impl Row {
    pub fn new(id: RowId, cells: HashMap<String, CellValue>) -> Self {
        Self { id, cells }
    }

    pub fn id(&self) -> RowId {
        self.id
    }

    /// Cell by column name, if present
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells.get(column)
    }

    /// Cell for a schema column; absent cells read as the type's empty value.
    pub fn cell(&self, column: &ColumnDefinition) -> &CellValue {
        self.cells
            .get(&column.name)
            .unwrap_or_else(|| CellValue::missing(column.column_type))
    }

    /// JSON object in schema order (identity excluded)
    pub fn to_json(&self, schema: &Schema) -> serde_json::Value {
        let map = schema
            .iter()
            .map(|col| (col.name.clone(), self.cell(col).to_json()))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}

/// Normalize one raw row against a finalized schema.
///
/// Raw keys not in the schema are ignored; schema columns missing from the
/// raw row get the type's empty value (`''` for text, null otherwise).
pub fn coerce_row(raw: &RawRow, schema: &Schema, id: RowId) -> Row {
    let cells = schema
        .iter()
        .map(|col| {
            let value = match raw.get(&col.name) {
                Some(raw_value) => coerce(raw_value, col.column_type),
                None => CellValue::missing(col.column_type).clone(),
            };
            (col.name.clone(), value)
        })
        .collect();
    Row::new(id, cells)
}

/// An immutable snapshot of canonical rows plus the schema describing them
#[derive(Debug, Clone)]
pub struct Dataset {
    schema: Schema,
    rows: Vec<Row>,
}

impl Dataset {
    /// Build from already-coerced rows.
    pub fn new(schema: Schema, rows: Vec<Row>) -> Self {
        Self { schema, rows }
    }

    /// Validate `columns` against `raw_rows`, then coerce every row.
    /// Row identities are assigned sequentially from zero.
    pub fn from_raw(columns: &[ColumnDefinition], raw_rows: &[RawRow]) -> Result<Self, SchemaError> {
        validate_schema(columns, raw_rows.len())?;
        let schema = Schema::new(columns.to_vec())?;
        let rows = raw_rows
            .iter()
            .enumerate()
            .map(|(i, raw)| coerce_row(raw, &schema, RowId(i as u64)))
            .collect();
        Ok(Self { schema, rows })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows as JSON objects in schema order (identities excluded)
    pub fn rows_json(&self) -> Vec<serde_json::Value> {
        self.rows.iter().map(|row| row.to_json(&self.schema)).collect()
    }
}
