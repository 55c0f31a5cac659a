// DataPacket CLI - import, query, chart and ask questions about tabular files

mod ai;
mod exit_codes;
mod util;

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use datapacket_engine::chart::{chart_series, ChartKind, ChartSpec, GroupOp};
use datapacket_engine::error::{ChartError, SchemaError};
use datapacket_engine::format::{format_aggregate, json_number};
use datapacket_engine::grid::{CellPos, Grid};
use datapacket_engine::import::{finalize, ImportedTable};
use datapacket_engine::query::{Aggregate, AggregateOp, Filter, FilterOperator, QuerySpec, Sort};
use datapacket_engine::row::{Dataset, Row};
use datapacket_engine::schema::{ColumnDefinition, Schema};
use datapacket_engine::value::{ColumnType, SortDirection};
use datapacket_io::ImportError;

use exit_codes::{
    chart_exit_code, import_exit_code, EXIT_ERROR, EXIT_IO, EXIT_SCHEMA, EXIT_SUCCESS, EXIT_USAGE,
};

#[derive(Parser)]
#[command(name = "dpk")]
#[command(about = "Typed import, querying, charting and questions over tabular data")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Log debug detail to stderr (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true, env = "DATAPACKET_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the schema inferred for a file
    #[command(after_help = "\
Examples:
  dpk infer sales.csv
  dpk infer report.xlsx --json")]
    Infer {
        file: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Filter, sort and aggregate a file
    #[command(after_help = "\
Examples:
  dpk query sales.csv --filter Region --op contains --value no
  dpk query sales.csv --sort Revenue --desc --json
  dpk query sales.csv --agg sum --agg-column Revenue
  dpk query sales.csv --filter Closed --op after --value 2024-01-01 -o q1.xlsx")]
    Query {
        file: PathBuf,

        #[command(flatten)]
        filter: FilterArgs,

        /// Sort by column
        #[arg(long, value_name = "COL")]
        sort: Option<String>,

        /// Sort descending (nulls stay last)
        #[arg(long, requires = "sort")]
        desc: bool,

        /// Aggregate: count, sum, avg, min, max
        #[arg(long, value_name = "OP", default_value = "count")]
        agg: AggregateOp,

        /// Numeric column for sum/avg/min/max
        #[arg(long, value_name = "COL")]
        agg_column: Option<String>,

        #[command(flatten)]
        types: TypeArgs,

        #[arg(long, conflicts_with = "output")]
        json: bool,

        /// Write the view to a .csv or .xlsx file instead of printing rows
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Compute chart series for a file (JSON)
    #[command(after_help = "\
Examples:
  dpk chart sales.csv
  dpk chart sales.csv --x Region --y Revenue --group-op sum
  dpk chart sales.csv --x Revenue --y Revenue --bin 10
  dpk chart sales.csv --x Closed --y Revenue --raw --type line")]
    Chart {
        file: PathBuf,

        /// X-axis column (default: first column)
        #[arg(long)]
        x: Option<String>,

        /// Y-axis column (default: first numeric column)
        #[arg(long)]
        y: Option<String>,

        /// Chart type: bar, line, pie
        #[arg(long = "type", default_value = "bar")]
        kind: ChartKind,

        /// One point per row instead of grouping by x
        #[arg(long)]
        raw: bool,

        /// Group reduction: count, sum, avg
        #[arg(long, default_value = "count", conflicts_with = "raw")]
        group_op: GroupOp,

        /// Bin numeric x values into ranges of this width
        #[arg(long, value_name = "N", conflicts_with = "raw")]
        bin: Option<f64>,

        #[command(flatten)]
        filter: FilterArgs,

        #[command(flatten)]
        types: TypeArgs,
    },

    /// Paste a tab-separated block (stdin) into a grid
    #[command(after_help = "\
Examples:
  printf 'a\\tb\\n1\\t2\\n' | dpk paste
  pbpaste | dpk paste --grid draft.csv --row 3 --col 1 --json
  pbpaste | dpk paste --commit --json")]
    Paste {
        /// Start from this file's cells instead of a blank grid
        #[arg(long, value_name = "FILE")]
        grid: Option<PathBuf>,

        /// Anchor row (0-indexed)
        #[arg(long, default_value_t = 0)]
        row: usize,

        /// Anchor column (0-indexed)
        #[arg(long, default_value_t = 0)]
        col: usize,

        /// Validate and coerce the grid into a dataset
        #[arg(long)]
        commit: bool,

        #[arg(long)]
        json: bool,
    },

    /// Ask a question about a file
    #[command(after_help = "\
Prints a JSON object: {\"success\": true, \"answer\": ..., \"logic\": ...} or
{\"success\": false, \"error\": ...}.

Examples:
  dpk ask sales.csv \"Which region has the highest revenue?\"
  dpk ask sales.csv \"Summarize Q1\" --context \"2024 pipeline export\"")]
    Ask {
        file: PathBuf,

        question: String,

        /// Short description of the dataset
        #[arg(long)]
        context: Option<String>,

        #[command(flatten)]
        types: TypeArgs,
    },

    /// Ask questions read line by line from stdin
    Chat {
        file: PathBuf,

        /// Short description of the dataset
        #[arg(long)]
        context: Option<String>,

        /// Print the transcript as JSON at the end
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        types: TypeArgs,
    },

    /// AI configuration and diagnostics
    Ai {
        #[command(subcommand)]
        command: AiCommands,
    },
}

#[derive(Subcommand)]
enum AiCommands {
    /// Show the resolved AI configuration
    Doctor {
        /// Output as JSON for machine parsing
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// Filter on column
    #[arg(long, value_name = "COL")]
    filter: Option<String>,

    /// Filter operator (default depends on the column type)
    #[arg(long, value_name = "OP", requires = "filter")]
    op: Option<FilterOperator>,

    /// Filter value; empty keeps every row
    #[arg(long, value_name = "VALUE", requires = "filter")]
    value: Option<String>,
}

impl FilterArgs {
    fn to_filter(&self, schema: &Schema) -> Result<Option<Filter>, CliError> {
        let Some(column) = &self.filter else {
            return Ok(None);
        };
        let column_type = column_type_of(schema, column)?;
        Ok(Some(Filter {
            column: column.clone(),
            operator: self.op.unwrap_or_else(|| FilterOperator::default_for(column_type)),
            value: self.value.clone().unwrap_or_default(),
        }))
    }
}

#[derive(Args, Debug, Default)]
struct TypeArgs {
    /// Override an inferred column type, e.g. --as Zip=text (repeatable)
    #[arg(long = "as", value_name = "COL=TYPE")]
    overrides: Vec<String>,
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  datapacket-engine ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    // A second init (e.g. from tests) is harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = cli.config.as_deref();

    let result = match cli.command {
        Commands::Infer { file, json } => cmd_infer(&file, json),
        Commands::Query { file, filter, sort, desc, agg, agg_column, types, json, output } => {
            cmd_query(&file, &filter, sort, desc, agg, agg_column, &types, json, output)
        }
        Commands::Chart { file, x, y, kind, raw, group_op, bin, filter, types } => {
            cmd_chart(&file, x, y, kind, raw, group_op, bin, &filter, &types)
        }
        Commands::Paste { grid, row, col, commit, json } => cmd_paste(grid, row, col, commit, json),
        Commands::Ask { file, question, context, types } => {
            ai::cmd_ask(config, &file, &question, context, &types.overrides)
        }
        Commands::Chat { file, context, json, types } => {
            ai::cmd_chat(config, &file, context, json, &types.overrides)
        }
        Commands::Ai { command } => match command {
            AiCommands::Doctor { json } => ai::cmd_ai_doctor(config, json),
        },
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn import(err: ImportError) -> Self {
        let hint = match &err {
            ImportError::UnsupportedFormat(_) => Some("supported: .csv .txt .tsv .tab .xlsx .xlsm .xls .xlsb .ods".to_string()),
            ImportError::Schema(SchemaError::DuplicateColumnName(name)) => {
                Some(format!("rename one of the '{}' header cells", name))
            }
            _ => None,
        };
        Self { code: import_exit_code(&err), message: err.to_string(), hint }
    }

    pub fn schema(err: SchemaError) -> Self {
        Self { code: EXIT_SCHEMA, message: err.to_string(), hint: None }
    }

    pub fn chart(err: ChartError) -> Self {
        Self { code: chart_exit_code(&err), message: err.to_string(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Read a file and infer its schema, applying `--as` overrides.
pub(crate) fn load_table(path: &Path, overrides: &[String]) -> Result<ImportedTable, CliError> {
    let mut table = datapacket_io::load(path).map_err(CliError::import)?;
    for spec in overrides {
        let (name, column_type) = parse_type_override(spec)?;
        if !table.set_column_type(name, column_type) {
            return Err(CliError::args(format!("unknown column {:?} in --as {}", name, spec)));
        }
    }
    Ok(table)
}

pub(crate) fn load_dataset(path: &Path, overrides: &[String]) -> Result<Dataset, CliError> {
    load_table(path, overrides)?.into_dataset().map_err(CliError::schema)
}

fn parse_type_override(spec: &str) -> Result<(&str, ColumnType), CliError> {
    let (name, ty) = spec
        .split_once('=')
        .ok_or_else(|| CliError::args(format!("expected COL=TYPE in --as, got {:?}", spec)))?;
    let column_type = ty.parse::<ColumnType>().map_err(CliError::args)?;
    Ok((name.trim(), column_type))
}

fn column_type_of(schema: &Schema, column: &str) -> Result<ColumnType, CliError> {
    schema.column_type(column).ok_or_else(|| {
        let names: Vec<&str> = schema.iter().map(|c| c.name.as_str()).collect();
        CliError::args(format!("unknown column {:?}", column)).with_hint(format!("columns: {}", names.join(", ")))
    })
}

fn print_json(value: &serde_json::Value) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| CliError::general(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

fn display_rows(schema: &Schema, rows: &[&Row]) -> Vec<Vec<String>> {
    rows.iter().map(|row| schema.iter().map(|col| row.cell(col).display()).collect()).collect()
}

fn column_names(columns: &[ColumnDefinition]) -> Vec<String> {
    columns.iter().map(|c| c.name.clone()).collect()
}

// ============================================================================
// infer
// ============================================================================

fn cmd_infer(file: &Path, json: bool) -> Result<(), CliError> {
    let table = load_table(file, &[])?;

    if json {
        return print_json(&serde_json::json!({
            "columns": table.columns,
            "row_count": table.rows.len(),
        }));
    }

    let rows: Vec<Vec<String>> = table
        .columns
        .iter()
        .map(|c| vec![c.name.clone(), c.column_type.as_str().to_string()])
        .collect();
    print!("{}", util::render_table(&["column".to_string(), "type".to_string()], &rows));
    println!("\n{} rows", table.rows.len());
    Ok(())
}

// ============================================================================
// query
// ============================================================================

#[allow(clippy::too_many_arguments)]
fn cmd_query(
    file: &Path,
    filter: &FilterArgs,
    sort: Option<String>,
    desc: bool,
    agg: AggregateOp,
    agg_column: Option<String>,
    types: &TypeArgs,
    json: bool,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    let dataset = load_dataset(file, &types.overrides)?;
    let schema = dataset.schema();

    if let Some(column) = &sort {
        column_type_of(schema, column)?;
    }
    if let Some(column) = &agg_column {
        column_type_of(schema, column)?;
    }
    if agg != AggregateOp::Count && agg_column.is_none() {
        return Err(CliError::args(format!("--agg {} needs --agg-column", agg_name(agg))));
    }

    let spec = QuerySpec {
        filter: filter.to_filter(schema)?,
        sort: sort.map(|column| Sort {
            column,
            direction: if desc { SortDirection::Descending } else { SortDirection::Ascending },
        }),
        aggregate: Aggregate { op: agg, column: agg_column },
    };
    let view = spec.run(&dataset);
    let aggregate_label = match &spec.aggregate.column {
        Some(column) if agg != AggregateOp::Count => format!("{}({})", agg_name(agg), column),
        _ => agg_name(agg).to_string(),
    };

    if let Some(path) = output {
        export(&path, schema, &view.rows)?;
        eprintln!("wrote {} rows to {}", view.rows.len(), path.display());
    } else if json {
        let rows: Vec<serde_json::Value> = view.rows.iter().map(|row| row.to_json(schema)).collect();
        return print_json(&serde_json::json!({
            "row_count": view.rows.len(),
            "total_rows": dataset.len(),
            "rows": rows,
            "aggregate": {
                "op": agg_name(agg),
                "column": spec.aggregate.column,
                "value": view.aggregate.map(json_number).unwrap_or(serde_json::Value::Null),
                "display": format_aggregate(view.aggregate),
            },
        }));
    } else {
        print!("{}", util::render_table(&column_names(schema.columns()), &display_rows(schema, &view.rows)));
        println!();
    }

    println!("{}: {}", aggregate_label, format_aggregate(view.aggregate));
    Ok(())
}

fn agg_name(op: AggregateOp) -> &'static str {
    match op {
        AggregateOp::Count => "count",
        AggregateOp::Sum => "sum",
        AggregateOp::Avg => "avg",
        AggregateOp::Min => "min",
        AggregateOp::Max => "max",
    }
}

fn export(path: &Path, schema: &Schema, rows: &[&Row]) -> Result<(), CliError> {
    let ext = path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase());
    let result = match ext.as_deref() {
        Some("xlsx") => datapacket_io::xlsx::export_view_xlsx(path, schema, rows),
        Some("csv") | None => datapacket_io::csv::export_view(path, schema, rows),
        Some(other) => return Err(CliError::args(format!("cannot export to .{} (use .csv or .xlsx)", other))),
    };
    result.map_err(|e| CliError::io(format!("{}: {}", path.display(), e)))
}

// ============================================================================
// chart
// ============================================================================

#[allow(clippy::too_many_arguments)]
fn cmd_chart(
    file: &Path,
    x: Option<String>,
    y: Option<String>,
    kind: ChartKind,
    raw: bool,
    group_op: GroupOp,
    bin: Option<f64>,
    filter: &FilterArgs,
    types: &TypeArgs,
) -> Result<(), CliError> {
    let dataset = load_dataset(file, &types.overrides)?;
    let schema = dataset.schema();

    let defaults = ChartSpec::for_schema(schema).ok_or_else(|| CliError::chart(ChartError::NoNumericData))?;
    let spec = ChartSpec {
        kind,
        x_axis: x.unwrap_or(defaults.x_axis),
        y_axis: y.unwrap_or(defaults.y_axis),
        group_data: !raw,
        group_op,
        bin_size: bin,
    };

    let view = QuerySpec { filter: filter.to_filter(schema)?, ..QuerySpec::default() }.run(&dataset);
    let series = chart_series(&view.rows, schema, &spec).map_err(CliError::chart)?;

    print_json(&serde_json::json!({
        "chart": spec,
        "data": series.to_json(),
    }))
}

// ============================================================================
// paste
// ============================================================================

fn cmd_paste(grid_file: Option<PathBuf>, row: usize, col: usize, commit: bool, json: bool) -> Result<(), CliError> {
    let mut grid = match &grid_file {
        Some(path) => {
            let table = datapacket_io::read_table(path).map_err(CliError::import)?;
            let columns: Vec<ColumnDefinition> =
                table.headers.iter().map(|h| ColumnDefinition::text(h.trim())).collect();
            Grid::from_table(&columns, &table.rows)
        }
        None => Grid::new(),
    };
    grid.ensure_seeded();

    let mut text = String::new();
    io::stdin().read_to_string(&mut text).map_err(|e| CliError::io(format!("stdin: {}", e)))?;

    let outcome = grid.paste(Some(CellPos::new(row, col)), &text);
    match &outcome {
        Some(o) => log::debug!(
            "pasted {}x{} block at ({}, {}); added {} columns, {} rows",
            o.block_rows, o.block_cols, row, col, o.added_columns, o.added_rows
        ),
        None => log::debug!("empty paste ignored"),
    }

    if commit {
        let dataset = finalize(grid.columns(), &grid.to_raw_rows()).map_err(CliError::schema)?;
        let schema = dataset.schema();
        let rows: Vec<&Row> = dataset.rows().iter().collect();
        if json {
            return print_json(&serde_json::json!({
                "columns": schema,
                "rows": dataset.rows_json(),
            }));
        }
        print!("{}", util::render_table(&column_names(schema.columns()), &display_rows(schema, &rows)));
        return Ok(());
    }

    if json {
        return print_json(&serde_json::json!({
            "columns": column_names(grid.columns()),
            "rows": grid.rows(),
            "added_columns": outcome.map_or(0, |o| o.added_columns),
            "added_rows": outcome.map_or(0, |o| o.added_rows),
        }));
    }

    print!("{}", util::render_table(&column_names(grid.columns()), grid.rows()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_override_parses() {
        let (name, ty) = parse_type_override(" Zip =text").unwrap();
        assert_eq!(name, "Zip");
        assert_eq!(ty, ColumnType::Text);
        assert_eq!(parse_type_override("Zip").unwrap_err().code, EXIT_USAGE);
        assert_eq!(parse_type_override("Zip=money").unwrap_err().code, EXIT_USAGE);
    }

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
