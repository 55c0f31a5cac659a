// File I/O: ingestion collaborators and view export

pub mod csv;
pub mod error;
pub mod xlsx;

use std::path::Path;

use datapacket_engine::import::{import_table, ImportedTable};
use datapacket_engine::row::RawRow;

pub use error::{ExportError, ImportError};

/// Ordered headers plus row mappings, as produced by a reader
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl ParsedTable {
    /// Run inference and validation on the parsed data.
    pub fn into_imported(self) -> Result<ImportedTable, ImportError> {
        Ok(import_table(&self.headers, self.rows)?)
    }
}

/// Supported source formats, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Tsv,
    Spreadsheet,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Result<Self, ImportError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" | "txt" => Ok(SourceFormat::Csv),
            "tsv" | "tab" => Ok(SourceFormat::Tsv),
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Ok(SourceFormat::Spreadsheet),
            _ => Err(ImportError::UnsupportedFormat(ext)),
        }
    }
}

/// Read a source file into headers and raw rows.
pub fn read_table(path: &Path) -> Result<ParsedTable, ImportError> {
    match SourceFormat::from_path(path)? {
        SourceFormat::Csv => self::csv::read_csv_file(path),
        SourceFormat::Tsv => self::csv::read_tsv_file(path),
        SourceFormat::Spreadsheet => xlsx::read_first_sheet(path),
    }
}

/// Read a source file and infer its schema.
pub fn load(path: &Path) -> Result<ImportedTable, ImportError> {
    let table = read_table(path)?;
    log::debug!("read {} rows, {} columns from {}", table.rows.len(), table.headers.len(), path.display());
    table.into_imported()
}
