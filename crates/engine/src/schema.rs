//! Schema definition and validation
//!
//! A `Schema` can only be built from column definitions whose trimmed names
//! are non-empty and unique. Row-count validation happens where rows exist
//! (see `validate_schema`).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::value::ColumnType;

/// One column: name plus type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self { name: name.into(), column_type }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Text)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Number)
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Date)
    }
}

/// Trim every column name, keeping order and types.
pub fn normalize_columns(columns: &[ColumnDefinition]) -> Vec<ColumnDefinition> {
    columns
        .iter()
        .map(|c| ColumnDefinition::new(c.name.trim(), c.column_type))
        .collect()
}

/// Validate a candidate schema against the data it will describe.
///
/// Checks run in a fixed order and the first failure is reported:
/// column count, empty names, duplicate names, row count.
pub fn validate_schema(columns: &[ColumnDefinition], row_count: usize) -> Result<(), SchemaError> {
    validate_names(columns)?;
    if row_count == 0 {
        return Err(SchemaError::NoRows);
    }
    Ok(())
}

fn validate_names(columns: &[ColumnDefinition]) -> Result<(), SchemaError> {
    if columns.is_empty() {
        return Err(SchemaError::NoColumns);
    }
    if let Some(index) = columns.iter().position(|c| c.name.trim().is_empty()) {
        return Err(SchemaError::EmptyColumnName { index });
    }
    let mut seen = HashSet::with_capacity(columns.len());
    for column in columns {
        let name = column.name.trim();
        if !seen.insert(name) {
            return Err(SchemaError::DuplicateColumnName(name.to_string()));
        }
    }
    Ok(())
}

/// A validated, ordered list of columns. Order is display order only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ColumnDefinition>", into = "Vec<ColumnDefinition>")]
pub struct Schema {
    columns: Vec<ColumnDefinition>,
}

impl Schema {
    /// Build a schema from raw definitions, trimming names.
    pub fn new(columns: Vec<ColumnDefinition>) -> Result<Self, SchemaError> {
        let columns = normalize_columns(&columns);
        validate_names(&columns)?;
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnDefinition> {
        self.columns.iter()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.column(name).map(|c| c.column_type)
    }

    pub fn numeric_columns(&self) -> impl Iterator<Item = &ColumnDefinition> {
        self.columns.iter().filter(|c| c.column_type == ColumnType::Number)
    }

    pub fn has_numeric_column(&self) -> bool {
        self.numeric_columns().next().is_some()
    }
}

impl TryFrom<Vec<ColumnDefinition>> for Schema {
    type Error = SchemaError;

    fn try_from(columns: Vec<ColumnDefinition>) -> Result<Self, Self::Error> {
        Schema::new(columns)
    }
}

impl From<Schema> for Vec<ColumnDefinition> {
    fn from(schema: Schema) -> Self {
        schema.columns
    }
}
