// Import pipeline: headers + raw rows -> inferred, validated table -> Dataset
//
// Ingestion (CSV text, spreadsheet file, manual grid) happens elsewhere and
// hands over ordered headers plus row mappings.

use crate::error::{ImportError, SchemaError};
use crate::infer::infer_schema;
use crate::row::{Dataset, RawRow};
use crate::schema::{normalize_columns, validate_schema, ColumnDefinition};
use crate::value::ColumnType;

/// A parsed source with an inferred (and validated) schema, not yet coerced.
///
/// The caller may adjust column names/types before calling
/// [`ImportedTable::into_dataset`].
#[derive(Debug, Clone)]
pub struct ImportedTable {
    pub columns: Vec<ColumnDefinition>,
    pub rows: Vec<RawRow>,
}

/// Infer and validate a schema for freshly ingested data.
///
/// Header names are trimmed and raw row keys are re-keyed to match, so a
/// header of `" Revenue "` reads its values under `"Revenue"`.
pub fn import_table(headers: &[String], rows: Vec<RawRow>) -> Result<ImportedTable, ImportError> {
    if rows.is_empty() {
        return Err(ImportError::NoData);
    }

    let inferred = infer_schema(headers, &rows);
    validate_schema(&inferred, rows.len())?;
    let columns = normalize_columns(&inferred);

    let rows = rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|(key, value)| (key.trim().to_string(), value))
                .collect::<RawRow>()
        })
        .collect();

    Ok(ImportedTable { columns, rows })
}

impl ImportedTable {
    /// Override a column's type (e.g. user correction of an inference).
    pub fn set_column_type(&mut self, name: &str, column_type: ColumnType) -> bool {
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(col) => {
                col.column_type = column_type;
                true
            }
            None => false,
        }
    }

    /// Validate the (possibly edited) schema and coerce every row.
    pub fn into_dataset(self) -> Result<Dataset, SchemaError> {
        finalize(&self.columns, &self.rows)
    }
}

/// Commit a schema against raw rows: validate, then coerce every row.
/// Also used for manually entered grids, which skip inference.
pub fn finalize(columns: &[ColumnDefinition], rows: &[RawRow]) -> Result<Dataset, SchemaError> {
    let dataset = Dataset::from_raw(columns, rows)?;
    log::debug!("finalized {} rows x {} columns", dataset.len(), dataset.schema().len());
    Ok(dataset)
}
