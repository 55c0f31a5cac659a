use std::fmt;

/// Schema invariant violations. The `Display` text is shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The schema has no columns at all.
    NoColumns,
    /// A column name is empty after trimming.
    EmptyColumnName { index: usize },
    /// Two columns share a name after trimming.
    DuplicateColumnName(String),
    /// The dataset has no data rows.
    NoRows,
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoColumns => write!(f, "Please add at least one column."),
            Self::EmptyColumnName { .. } => write!(f, "Column names cannot be empty."),
            Self::DuplicateColumnName(_) => write!(f, "Column names must be unique."),
            Self::NoRows => write!(f, "Please add at least one row of data."),
        }
    }
}

impl std::error::Error for SchemaError {}

/// Failure turning an ingested header/row table into a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    /// The source produced no data rows.
    NoData,
    /// The inferred schema was rejected.
    Schema(SchemaError),
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoData => write!(f, "No data found."),
            Self::Schema(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ImportError {}

impl From<SchemaError> for ImportError {
    fn from(err: SchemaError) -> Self {
        Self::Schema(err)
    }
}

/// Reasons a chart series cannot be produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartError {
    /// The schema has no numeric column to plot.
    NoNumericData,
    /// An axis references a column missing from the schema.
    UnknownColumn(String),
    /// The y-axis column is not numeric.
    NotNumeric(String),
}

impl fmt::Display for ChartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoNumericData => write!(f, "no numeric data to chart"),
            Self::UnknownColumn(name) => write!(f, "unknown column '{name}'"),
            Self::NotNumeric(name) => write!(f, "column '{name}' is not numeric"),
        }
    }
}

impl std::error::Error for ChartError {}
