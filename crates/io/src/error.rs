use std::fmt;

use datapacket_engine::error::{ImportError as TableError, SchemaError};

/// Why a source file could not be turned into a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    /// The source parsed but held no data rows.
    NoData,
    Csv(String),
    Excel(String),
    Io(String),
    /// The first worksheet has no cells at all.
    EmptySheet,
    /// File extension not recognized.
    UnsupportedFormat(String),
    Schema(SchemaError),
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoData => write!(f, "No data found."),
            Self::Csv(msg) => write!(f, "Failed to parse CSV: {msg}"),
            Self::Excel(msg) => write!(f, "Failed to parse Excel file: {msg}"),
            Self::Io(msg) => write!(f, "{msg}"),
            Self::EmptySheet => write!(f, "Failed to parse Excel file: Empty sheet"),
            Self::UnsupportedFormat(ext) => {
                write!(f, "unsupported file type '{ext}' (expected csv, tsv, xlsx, xls or ods)")
            }
            Self::Schema(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ImportError {}

impl From<TableError> for ImportError {
    fn from(err: TableError) -> Self {
        match err {
            TableError::NoData => Self::NoData,
            TableError::Schema(e) => Self::Schema(e),
        }
    }
}

impl From<SchemaError> for ImportError {
    fn from(err: SchemaError) -> Self {
        Self::Schema(err)
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err.to_string())
    }
}

/// Why a view could not be written out.
#[derive(Debug)]
pub enum ExportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Xlsx(String),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "Failed to export CSV: {e}"),
            Self::Csv(e) => write!(f, "Failed to export CSV: {e}"),
            Self::Xlsx(msg) => write!(f, "Failed to export Excel: {msg}"),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Csv(e) => Some(e),
            Self::Xlsx(_) => None,
        }
    }
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}
