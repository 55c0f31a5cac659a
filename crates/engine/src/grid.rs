//! Manual-entry grid and the paste reconciler
//!
//! The grid is a ragged-safe matrix of strings under a list of column
//! definitions. Pasting a tab/newline block anchored at the active cell grows
//! the grid (auto-labelled columns, empty rows) so every pasted value lands at
//! `(anchor.row + i, anchor.col + j)`.
//!
//! Delimiters are literal: quoted cells containing tabs/newlines are not
//! recognized.

use serde::{Deserialize, Serialize};

use crate::row::RawRow;
use crate::schema::ColumnDefinition;
use crate::value::{ColumnType, RawValue};

/// Columns in a freshly seeded grid
pub const SEED_COLUMNS: usize = 5;

/// Rows in a freshly seeded grid
pub const SEED_ROWS: usize = 20;

/// Convert 0-indexed column to letter (0 = A, 25 = Z, 26 = AA, etc.)
pub fn column_label(index: usize) -> String {
    let mut result = String::new();
    let mut n = index;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

/// Grid coordinate (0-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellPos {
    pub row: usize,
    pub col: usize,
}

impl CellPos {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Summary of a reconciled paste
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasteOutcome {
    /// Height of the pasted block
    pub block_rows: usize,
    /// Widest line of the pasted block
    pub block_cols: usize,
    pub added_columns: usize,
    pub added_rows: usize,
}

/// Split pasted text into lines, then cells. Trailing whitespace of the whole
/// block is dropped first, so a copied row ending in a tab adds no column.
pub fn parse_block(text: &str) -> Vec<Vec<String>> {
    let trimmed = text.trim_end();
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .map(|line| line.split('\t').map(str::to_string).collect())
        .collect()
}

/// Manual-entry grid
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    columns: Vec<ColumnDefinition>,
    rows: Vec<Vec<String>>,
}

impl Grid {
    pub fn new() -> Self {
        Self::default()
    }

    /// A blank grid with [`SEED_COLUMNS`] text columns and [`SEED_ROWS`] empty rows
    pub fn seeded() -> Self {
        let mut grid = Self::new();
        grid.ensure_seeded();
        grid
    }

    /// Load imported data: one grid row per raw row, cells in column order.
    pub fn from_table(columns: &[ColumnDefinition], rows: &[RawRow]) -> Self {
        let rows = rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|col| row.get(&col.name).map(RawValue::to_text).unwrap_or_default())
                    .collect()
            })
            .collect();
        Self { columns: columns.to_vec(), rows }
    }

    /// Seed an empty grid; a grid that already has columns is left alone.
    pub fn ensure_seeded(&mut self) {
        if !self.columns.is_empty() {
            return;
        }
        self.columns = (0..SEED_COLUMNS).map(|i| ColumnDefinition::text(column_label(i))).collect();
        self.rows = vec![vec![String::new(); SEED_COLUMNS]; SEED_ROWS];
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn col_count(&self) -> usize {
        self.columns.len()
    }

    /// Cell text; out-of-range reads as empty.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Append a text column labelled from its position. Returns its index.
    pub fn add_column(&mut self) -> usize {
        let index = self.columns.len();
        self.columns.push(ColumnDefinition::text(column_label(index)));
        if self.rows.is_empty() {
            self.rows.push(vec![String::new(); self.columns.len()]);
        } else {
            self.pad_rows();
        }
        index
    }

    /// Remove a column and its cell from every row.
    pub fn remove_column(&mut self, index: usize) -> Option<ColumnDefinition> {
        if index >= self.columns.len() {
            return None;
        }
        let removed = self.columns.remove(index);
        for row in &mut self.rows {
            if index < row.len() {
                row.remove(index);
            }
        }
        Some(removed)
    }

    pub fn rename_column(&mut self, index: usize, name: impl Into<String>) -> bool {
        match self.columns.get_mut(index) {
            Some(col) => {
                col.name = name.into();
                true
            }
            None => false,
        }
    }

    pub fn set_column_type(&mut self, index: usize, column_type: ColumnType) -> bool {
        match self.columns.get_mut(index) {
            Some(col) => {
                col.column_type = column_type;
                true
            }
            None => false,
        }
    }

    /// Write one cell, growing the grid as a 1x1 paste would.
    pub fn set_cell(&mut self, row: usize, col: usize, value: impl Into<String>) {
        self.grow_to(row + 1, col + 1);
        self.rows[row][col] = value.into();
    }

    /// Reconcile a pasted block anchored at `anchor`.
    ///
    /// No anchor (nothing focused) or an empty block is a no-op and returns
    /// `None`. Existing content under the block is overwritten.
    pub fn paste(&mut self, anchor: Option<CellPos>, text: &str) -> Option<PasteOutcome> {
        let anchor = anchor?;
        let block = parse_block(text);
        if block.is_empty() {
            return None;
        }

        let block_rows = block.len();
        let block_cols = block.iter().map(Vec::len).max().unwrap_or(0);
        let needed_rows = anchor.row + block_rows;
        let needed_cols = anchor.col + block_cols;

        let before = (self.rows.len(), self.columns.len());
        self.grow_to(needed_rows, needed_cols);

        for (row_offset, values) in block.into_iter().enumerate() {
            let target_row = &mut self.rows[anchor.row + row_offset];
            for (col_offset, value) in values.into_iter().enumerate() {
                target_row[anchor.col + col_offset] = value;
            }
        }

        Some(PasteOutcome {
            block_rows,
            block_cols,
            added_columns: self.columns.len() - before.1,
            added_rows: self.rows.len() - before.0,
        })
    }

    /// Raw rows keyed by trimmed column name, matching the committed schema.
    /// Rows whose cells are all empty are dropped.
    pub fn to_raw_rows(&self) -> Vec<RawRow> {
        self.rows
            .iter()
            .filter(|row| row.iter().take(self.columns.len()).any(|v| !v.is_empty()))
            .map(|row| {
                self.columns
                    .iter()
                    .enumerate()
                    .map(|(i, col)| {
                        let value = row.get(i).cloned().unwrap_or_default();
                        (col.name.trim().to_string(), RawValue::Text(value))
                    })
                    .collect()
            })
            .collect()
    }

    fn grow_to(&mut self, needed_rows: usize, needed_cols: usize) {
        while self.columns.len() < needed_cols {
            let index = self.columns.len();
            self.columns.push(ColumnDefinition::text(column_label(index)));
        }
        while self.rows.len() < needed_rows {
            self.rows.push(vec![String::new(); self.columns.len()]);
        }
        self.pad_rows();
    }

    fn pad_rows(&mut self) {
        let width = self.columns.len();
        for row in &mut self.rows {
            if row.len() < width {
                row.resize(width, String::new());
            }
        }
    }
}
