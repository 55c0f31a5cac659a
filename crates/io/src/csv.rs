// CSV/TSV ingestion and view export

use std::io::{Read, Write};
use std::path::Path;

use datapacket_engine::row::{RawRow, Row};
use datapacket_engine::schema::Schema;
use datapacket_engine::value::RawValue;

use crate::error::{ExportError, ImportError};
use crate::ParsedTable;

pub fn read_csv_file(path: &Path) -> Result<ParsedTable, ImportError> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    parse_text(&content, delimiter)
}

pub fn read_tsv_file(path: &Path) -> Result<ParsedTable, ImportError> {
    let content = read_file_as_utf8(path)?;
    parse_text(&content, b'\t')
}

/// Parse CSV text with a header row, detecting the delimiter.
pub fn parse_csv_text(content: &str) -> Result<ParsedTable, ImportError> {
    parse_text(content, sniff_delimiter(content))
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().filter(|l| !l.is_empty()).take(10).collect();

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        let target = counts.first().copied().unwrap_or(0);
        if target <= 1 {
            continue;
        }

        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;
        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, ImportError> {
    let mut file = std::fs::File::open(path)
        .map_err(|e| ImportError::Io(format!("Failed to open {}: {}", path.display(), e)))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            log::debug!("{} is not UTF-8, decoding as Windows-1252", path.display());
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

fn parse_text(content: &str, delimiter: u8) -> Result<ParsedTable, ImportError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records();
    let headers: Vec<String> = match records.next() {
        Some(record) => record?.iter().map(str::to_string).collect(),
        None => return Ok(ParsedTable::default()),
    };

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for result in records {
        let record = result?;
        if record.iter().all(str::is_empty) {
            skipped += 1;
            continue;
        }
        // Fields past the header width have no name and are dropped
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(header, field)| (header.clone(), RawValue::from(field)))
            .collect();
        rows.push(row);
    }

    if skipped > 0 {
        log::debug!("skipped {} empty lines", skipped);
    }

    Ok(ParsedTable { headers, rows })
}

/// Write a view as CSV: header row in schema order, then display values.
pub fn write_view<W: Write>(writer: W, schema: &Schema, rows: &[&Row], delimiter: u8) -> Result<(), ExportError> {
    let mut writer = csv::WriterBuilder::new().delimiter(delimiter).from_writer(writer);

    writer.write_record(schema.iter().map(|col| col.name.as_str()))?;
    for row in rows {
        writer.write_record(schema.iter().map(|col| row.cell(col).display()))?;
    }

    writer.flush()?;
    Ok(())
}

pub fn export_view(path: &Path, schema: &Schema, rows: &[&Row]) -> Result<(), ExportError> {
    let file = std::fs::File::create(path)?;
    write_view(file, schema, rows, b',')
}
