//! Tabular data engine: schema inference, row coercion, query evaluation,
//! chart transforms and grid paste reconciliation.
//!
//! Everything here is synchronous and pure over an in-memory snapshot:
//! `view = chart_series(query.run(dataset), chart_spec)`.

pub mod chart;
pub mod error;
pub mod format;
pub mod grid;
pub mod import;
pub mod infer;
pub mod query;
pub mod row;
pub mod schema;
pub mod value;

pub use chart::{chart_series, ChartKind, ChartPoint, ChartSeries, ChartSpec, GroupOp};
pub use error::{ChartError, ImportError, SchemaError};
pub use format::{format_aggregate, format_number};
pub use grid::{column_label, CellPos, Grid, PasteOutcome};
pub use import::{finalize, import_table, ImportedTable};
pub use infer::{infer_schema, INFERENCE_SAMPLE_ROWS};
pub use query::{
    aggregate_rows, filter_rows, sort_rows, Aggregate, AggregateOp, Filter, FilterOperator, QuerySpec, QueryView, Sort,
};
pub use row::{coerce_row, Dataset, RawRow, Row, RowId};
pub use schema::{validate_schema, ColumnDefinition, Schema};
pub use value::{coerce, compare, CellValue, ColumnType, DateCell, RawValue, SortDirection};
