// Spreadsheet ingestion (xlsx, xls, xlsb, ods) and view export (xlsx only)
//
// Import reads the first worksheet only: row 1 is the header row, every
// following non-blank row becomes one raw row keyed by header.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use chrono::DateTime;
use rust_xlsxwriter::Workbook as XlsxWorkbook;

use datapacket_engine::row::{RawRow, Row};
use datapacket_engine::schema::Schema;
use datapacket_engine::value::{to_iso, CellValue, DateCell, RawValue};

use crate::error::{ExportError, ImportError};
use crate::ParsedTable;

/// Worksheet name used for exported views
pub const EXPORT_SHEET_NAME: &str = "Data";

/// Days between the 1900 date system epoch (1899-12-30) and 1970-01-01
const EXCEL_UNIX_EPOCH_DAYS: f64 = 25569.0;
const MS_PER_DAY: f64 = 86_400_000.0;

pub fn read_first_sheet(path: &Path) -> Result<ParsedTable, ImportError> {
    let mut workbook: Sheets<_> =
        open_workbook_auto(path).map_err(|e| ImportError::Excel(format!("Failed to open Excel file: {}", e)))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let Some(first) = sheet_names.first() else {
        return Err(ImportError::Excel("Excel file contains no sheets".to_string()));
    };

    let range = workbook
        .worksheet_range(first)
        .map_err(|e| ImportError::Excel(format!("Failed to read sheet '{}': {}", first, e)))?;

    if range.is_empty() {
        return Err(ImportError::EmptySheet);
    }
    log::debug!("reading first sheet '{}' of {}", first, sheet_names.len());

    let mut cells = range.rows();
    let headers: Vec<String> = match cells.next() {
        Some(header_row) => header_row.iter().map(|cell| data_to_raw(cell).to_text()).collect(),
        None => return Err(ImportError::EmptySheet),
    };

    let rows: Vec<RawRow> = cells
        .filter(|row| row.iter().any(|cell| !matches!(cell, Data::Empty)))
        .map(|row| {
            headers
                .iter()
                .zip(row.iter())
                .map(|(header, cell)| (header.clone(), data_to_raw(cell)))
                .collect()
        })
        .collect();

    Ok(ParsedTable { headers, rows })
}

/// Map a worksheet cell onto an untyped value. Dates become ISO text so that
/// inference sees them as dates rather than serial numbers.
fn data_to_raw(cell: &Data) -> RawValue {
    match cell {
        Data::Empty => RawValue::Empty,
        Data::String(s) => RawValue::Text(s.clone()),
        Data::Float(n) => RawValue::Number(*n),
        Data::Int(n) => RawValue::Number(*n as f64),
        Data::Bool(b) => RawValue::Bool(*b),
        Data::Error(e) => RawValue::Text(format!("#{:?}", e)),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            match excel_serial_to_iso(serial) {
                Some(iso) => RawValue::Text(iso),
                None => RawValue::Number(serial),
            }
        }
        Data::DateTimeIso(s) => RawValue::Text(s.clone()),
        Data::DurationIso(s) => RawValue::Text(s.clone()),
    }
}

/// Convert a 1900-system serial to canonical ISO text.
pub fn excel_serial_to_iso(serial: f64) -> Option<String> {
    if !serial.is_finite() {
        return None;
    }
    let ms = ((serial - EXCEL_UNIX_EPOCH_DAYS) * MS_PER_DAY).round() as i64;
    DateTime::from_timestamp_millis(ms).map(|dt| to_iso(&dt))
}

/// Write a view to a single-sheet workbook: header row, then typed cells.
/// Null numbers and missing dates are left blank.
pub fn export_view_xlsx(path: &Path, schema: &Schema, rows: &[&Row]) -> Result<(), ExportError> {
    let mut workbook = XlsxWorkbook::new();
    let worksheet = workbook
        .add_worksheet()
        .set_name(EXPORT_SHEET_NAME)
        .map_err(|e| ExportError::Xlsx(format!("Failed to create sheet: {}", e)))?;

    for (col, column) in schema.iter().enumerate() {
        let col16 = to_col(col)?;
        worksheet
            .write_string(0, col16, column.name.as_str())
            .map_err(|e| ExportError::Xlsx(format!("Failed to write header ({}): {}", col, e)))?;
    }

    for (idx, row) in rows.iter().enumerate() {
        let row32 = u32::try_from(idx + 1).map_err(|_| ExportError::Xlsx("too many rows".to_string()))?;
        for (col, column) in schema.iter().enumerate() {
            let col16 = to_col(col)?;
            let written = match row.cell(column) {
                CellValue::Number(Some(n)) => worksheet.write_number(row32, col16, *n).map(|_| ()),
                CellValue::Number(None) | CellValue::Date(DateCell::Missing) => Ok(()),
                CellValue::Text(s) if s.is_empty() => Ok(()),
                other => worksheet.write_string(row32, col16, other.display()).map(|_| ()),
            };
            written.map_err(|e| ExportError::Xlsx(format!("Failed to write cell ({}, {}): {}", idx + 1, col, e)))?;
        }
    }

    workbook
        .save(path)
        .map_err(|e| ExportError::Xlsx(format!("Failed to save XLSX file: {}", e)))?;
    log::debug!("exported {} rows to {}", rows.len(), path.display());
    Ok(())
}

fn to_col(col: usize) -> Result<u16, ExportError> {
    u16::try_from(col).map_err(|_| ExportError::Xlsx(format!("too many columns ({})", col + 1)))
}
