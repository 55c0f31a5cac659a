//! Type Model - column kinds, raw and canonical cell values
//!
//! Key invariants:
//! - A cell is always interpreted through its column's `ColumnType`
//! - Coercion never fails: unparseable numbers/dates degrade to null
//! - Null sorts after every non-null value, in both directions

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize, Serializer};

use crate::format::{format_number, json_number};

// =============================================================================
// ColumnType
// =============================================================================

/// The three supported column kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    #[default]
    Text,
    Number,
    Date,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Number => "number",
            ColumnType::Date => "date",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(ColumnType::Text),
            "number" => Ok(ColumnType::Number),
            "date" => Ok(ColumnType::Date),
            other => Err(format!("unknown column type '{other}' (expected text, number or date)")),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

// =============================================================================
// RawValue: what ingestion hands us
// =============================================================================

/// An untyped cell value as produced by a CSV/spreadsheet reader or manual entry
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl RawValue {
    /// Absent or empty-string cells carry no type evidence.
    pub fn is_blank(&self) -> bool {
        match self {
            RawValue::Empty => true,
            RawValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Numeric reading of the value, `None` unless it is a finite number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            RawValue::Empty => None,
            RawValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            RawValue::Number(n) => n.is_finite().then_some(*n),
            RawValue::Text(s) => parse_number(s),
        }
    }

    /// Date reading of the value. Bare numbers are epoch milliseconds.
    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            RawValue::Empty | RawValue::Bool(_) => None,
            RawValue::Number(n) => {
                if n.is_finite() {
                    Utc.timestamp_millis_opt(*n as i64).single()
                } else {
                    None
                }
            }
            RawValue::Text(s) => parse_date(s),
        }
    }

    /// Stringified form; absent values become the empty string.
    pub fn to_text(&self) -> String {
        match self {
            RawValue::Empty => String::new(),
            RawValue::Bool(b) => b.to_string(),
            RawValue::Number(n) => format_number(*n),
            RawValue::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

// =============================================================================
// CellValue: canonical per-type representation
// =============================================================================

/// A date cell after coercion
#[derive(Debug, Clone, PartialEq)]
pub enum DateCell {
    /// Source was empty or absent
    Missing,
    Parsed(DateTime<Utc>),
    /// Source text that failed to parse, kept for display
    Unparsed(String),
}

/// A coerced cell value. The variant always matches the column's type.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(Option<f64>),
    Date(DateCell),
}

static MISSING_TEXT: CellValue = CellValue::Text(String::new());
static MISSING_NUMBER: CellValue = CellValue::Number(None);
static MISSING_DATE: CellValue = CellValue::Date(DateCell::Missing);

impl CellValue {
    /// The value a column holds when the source row has no entry for it.
    pub fn missing(column_type: ColumnType) -> &'static CellValue {
        match column_type {
            ColumnType::Text => &MISSING_TEXT,
            ColumnType::Number => &MISSING_NUMBER,
            ColumnType::Date => &MISSING_DATE,
        }
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            CellValue::Text(_) => ColumnType::Text,
            CellValue::Number(_) => ColumnType::Number,
            CellValue::Date(_) => ColumnType::Date,
        }
    }

    /// Null in the engine's sense: failed or absent number/date.
    /// Text is never null.
    pub fn is_null(&self) -> bool {
        match self {
            CellValue::Text(_) => false,
            CellValue::Number(n) => n.is_none(),
            CellValue::Date(d) => !matches!(d, DateCell::Parsed(_)),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => *n,
            CellValue::Text(s) => parse_number(s),
            CellValue::Date(_) => None,
        }
    }

    pub fn as_instant(&self) -> Option<DateTime<Utc>> {
        match self {
            CellValue::Date(DateCell::Parsed(dt)) => Some(*dt),
            CellValue::Date(_) | CellValue::Number(_) => None,
            CellValue::Text(s) => parse_date(s),
        }
    }

    /// Display string. Null numbers/dates render empty; unparsed dates keep their text.
    pub fn display(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(Some(n)) => format_number(*n),
            CellValue::Number(None) => String::new(),
            CellValue::Date(DateCell::Parsed(dt)) => to_iso(dt),
            CellValue::Date(DateCell::Unparsed(s)) => s.clone(),
            CellValue::Date(DateCell::Missing) => String::new(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            CellValue::Text(s) => serde_json::Value::String(s.clone()),
            CellValue::Number(Some(n)) => json_number(*n),
            CellValue::Number(None) => serde_json::Value::Null,
            CellValue::Date(DateCell::Parsed(dt)) => serde_json::Value::String(to_iso(dt)),
            CellValue::Date(DateCell::Unparsed(s)) => serde_json::Value::String(s.clone()),
            CellValue::Date(DateCell::Missing) => serde_json::Value::Null,
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Text(s) => serializer.serialize_str(s),
            CellValue::Number(Some(n)) => json_number(*n).serialize(serializer),
            CellValue::Number(None) => serializer.serialize_none(),
            CellValue::Date(DateCell::Parsed(dt)) => serializer.serialize_str(&to_iso(dt)),
            CellValue::Date(DateCell::Unparsed(s)) => serializer.serialize_str(s),
            CellValue::Date(DateCell::Missing) => serializer.serialize_none(),
        }
    }
}

// =============================================================================
// Coercion
// =============================================================================

/// Convert a raw value into the canonical representation for `column_type`.
///
/// A blank string in a number column is `0`, like a spreadsheet formula
/// reading an empty cell; an absent value stays null.
pub fn coerce(raw: &RawValue, column_type: ColumnType) -> CellValue {
    match column_type {
        ColumnType::Number => match raw {
            RawValue::Text(s) if s.trim().is_empty() => CellValue::Number(Some(0.0)),
            _ => CellValue::Number(raw.as_number()),
        },
        ColumnType::Date => {
            if raw.is_blank() {
                return CellValue::Date(DateCell::Missing);
            }
            match raw.as_date() {
                Some(dt) => CellValue::Date(DateCell::Parsed(dt)),
                None => CellValue::Date(DateCell::Unparsed(raw.to_text())),
            }
        }
        ColumnType::Text => CellValue::Text(raw.to_text()),
    }
}

// =============================================================================
// Comparison
// =============================================================================

/// Normalized key used for ordering cells of one column
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum ComparableKey {
    Null,
    Number(OrderedFloat<f64>),
    Instant(i64),
    /// Lower-cased for case-insensitive ordering
    Text(String),
}

impl ComparableKey {
    fn of(cell: &CellValue, column_type: ColumnType) -> Self {
        match column_type {
            ColumnType::Number => cell
                .as_number()
                .map(|n| ComparableKey::Number(OrderedFloat(n)))
                .unwrap_or(ComparableKey::Null),
            ColumnType::Date => cell
                .as_instant()
                .map(|dt| ComparableKey::Instant(dt.timestamp_millis()))
                .unwrap_or(ComparableKey::Null),
            ColumnType::Text => ComparableKey::Text(cell.display().to_lowercase()),
        }
    }
}

/// Compare two cells of a column of `column_type`.
///
/// Numbers compare arithmetically, dates by epoch milliseconds, text
/// case-insensitively. A null sorts after every non-null value whatever the
/// direction; two nulls are equal.
pub fn compare(
    a: &CellValue,
    b: &CellValue,
    column_type: ColumnType,
    direction: SortDirection,
) -> Ordering {
    let ka = ComparableKey::of(a, column_type);
    let kb = ComparableKey::of(b, column_type);
    match (&ka, &kb) {
        (ComparableKey::Null, ComparableKey::Null) => Ordering::Equal,
        (ComparableKey::Null, _) => Ordering::Greater,
        (_, ComparableKey::Null) => Ordering::Less,
        _ => match direction {
            SortDirection::Ascending => ka.cmp(&kb),
            SortDirection::Descending => kb.cmp(&ka),
        },
    }
}

// =============================================================================
// Generic number/date parsing
// =============================================================================

/// Parse a number the way a lenient spreadsheet import does: surrounding
/// whitespace ignored, decimal/exponent notation, `0x`/`0o`/`0b` prefixes.
/// Non-finite results are rejected.
pub fn parse_number(s: &str) -> Option<f64> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }

    let prefixed = [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)];
    for (prefix, radix) in prefixed {
        if let Some(digits) = t.strip_prefix(prefix) {
            if digits.is_empty() {
                return None;
            }
            return digits
                .chars()
                .try_fold(0f64, |acc, c| c.to_digit(radix).map(|d| acc * radix as f64 + d as f64))
                .filter(|n| n.is_finite());
        }
    }

    // Rust accepts "inf"/"nan"/"infinity"; a spreadsheet cell saying so is text.
    if t.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        return None;
    }

    t.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Date-time layouts without an offset, read as local time
const LOCAL_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// Date-only layouts other than ISO, read as local midnight
const LOCAL_DATE_FORMATS: &[&str] = &[
    "%m/%d/%Y",
    "%Y/%m/%d",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
    "%d %b %Y",
    "%d %B %Y",
];

/// Generic date parsing.
///
/// ISO dates (`2024-03-15`) and bare years are UTC midnight; date-times with
/// an offset are exact; everything else is local time.
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(t) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M%:z", "%Y-%m-%d %H:%M:%S%.f%#z"] {
        if let Ok(dt) = DateTime::parse_from_str(t, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(t, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    if t.len() == 4 && t.bytes().all(|b| b.is_ascii_digit()) {
        let year: i32 = t.parse().ok()?;
        return NaiveDate::from_ymd_opt(year, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc());
    }

    for fmt in LOCAL_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(t, fmt) {
            return local_to_utc(naive);
        }
    }
    for fmt in LOCAL_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(t, fmt) {
            return date.and_hms_opt(0, 0, 0).and_then(local_to_utc);
        }
    }

    None
}

fn local_to_utc(naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Canonical ISO-8601 rendering with millisecond precision (`2024-03-15T00:00:00.000Z`)
pub fn to_iso(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number_js_like() {
        assert_eq!(parse_number("42"), Some(42.0));
        assert_eq!(parse_number("  -3.5 "), Some(-3.5));
        assert_eq!(parse_number("1e3"), Some(1000.0));
        assert_eq!(parse_number(".5"), Some(0.5));
        assert_eq!(parse_number("0x1F"), Some(31.0));
        assert_eq!(parse_number("0b101"), Some(5.0));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("   "), None);
        assert_eq!(parse_number("bad"), None);
        assert_eq!(parse_number("1,000"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("Infinity"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("0x"), None);
    }

    #[test]
    fn test_parse_date_iso_forms() {
        let dt = parse_date("2024-03-15").unwrap();
        assert_eq!(to_iso(&dt), "2024-03-15T00:00:00.000Z");

        let dt = parse_date("2024-03-15T10:30:00Z").unwrap();
        assert_eq!(to_iso(&dt), "2024-03-15T10:30:00.000Z");

        let dt = parse_date("2024-03-15T10:30:00+02:00").unwrap();
        assert_eq!(to_iso(&dt), "2024-03-15T08:30:00.000Z");

        let dt = parse_date("2024").unwrap();
        assert_eq!(to_iso(&dt), "2024-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_parse_date_local_forms_parse() {
        assert!(parse_date("03/15/2024").is_some());
        assert!(parse_date("2024/03/15").is_some());
        assert!(parse_date("Mar 15, 2024").is_some());
        assert!(parse_date("15 March 2024").is_some());
        assert!(parse_date("2024-03-15 08:00").is_some());
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(parse_date("").is_none());
        assert!(parse_date("North").is_none());
        assert!(parse_date("2024-13-45").is_none());
        assert!(parse_date("12345").is_none());
    }

    #[test]
    fn test_coerce_number() {
        assert_eq!(coerce(&RawValue::from("100"), ColumnType::Number), CellValue::Number(Some(100.0)));
        assert_eq!(coerce(&RawValue::Number(2.5), ColumnType::Number), CellValue::Number(Some(2.5)));
        assert_eq!(coerce(&RawValue::from("bad"), ColumnType::Number), CellValue::Number(None));
        assert_eq!(coerce(&RawValue::Empty, ColumnType::Number), CellValue::Number(None));
        assert_eq!(coerce(&RawValue::Number(f64::NAN), ColumnType::Number), CellValue::Number(None));
    }

    #[test]
    fn test_coerce_blank_text_number_is_zero() {
        assert_eq!(coerce(&RawValue::from(""), ColumnType::Number), CellValue::Number(Some(0.0)));
        assert_eq!(coerce(&RawValue::from("  \t"), ColumnType::Number), CellValue::Number(Some(0.0)));
        assert_eq!(coerce(&RawValue::Empty, ColumnType::Number), CellValue::Number(None));
        // dates and text are untouched by the rule
        assert_eq!(coerce(&RawValue::from(""), ColumnType::Date), CellValue::Date(DateCell::Missing));
        assert_eq!(coerce(&RawValue::from(""), ColumnType::Text), CellValue::Text(String::new()));
    }

    #[test]
    fn test_coerce_date_keeps_unparsed_text() {
        let cell = coerce(&RawValue::from("someday"), ColumnType::Date);
        assert_eq!(cell, CellValue::Date(DateCell::Unparsed("someday".into())));
        assert!(cell.is_null(), "unparsed date counts as null for ordering");
        assert_eq!(cell.display(), "someday");

        assert_eq!(coerce(&RawValue::Empty, ColumnType::Date), CellValue::Date(DateCell::Missing));
        assert_eq!(coerce(&RawValue::from(""), ColumnType::Date), CellValue::Date(DateCell::Missing));

        let cell = coerce(&RawValue::from("2024-03-15"), ColumnType::Date);
        assert_eq!(cell.display(), "2024-03-15T00:00:00.000Z");
    }

    #[test]
    fn test_coerce_text_never_null() {
        assert_eq!(coerce(&RawValue::Empty, ColumnType::Text), CellValue::Text(String::new()));
        assert_eq!(coerce(&RawValue::Number(7.0), ColumnType::Text), CellValue::Text("7".into()));
        assert_eq!(coerce(&RawValue::Bool(true), ColumnType::Text), CellValue::Text("true".into()));
        assert!(!coerce(&RawValue::Empty, ColumnType::Text).is_null());
    }

    #[test]
    fn test_compare_nulls_last_both_directions() {
        let null = CellValue::Number(None);
        let one = CellValue::Number(Some(1.0));
        for direction in [SortDirection::Ascending, SortDirection::Descending] {
            assert_eq!(compare(&null, &one, ColumnType::Number, direction), Ordering::Greater);
            assert_eq!(compare(&one, &null, ColumnType::Number, direction), Ordering::Less);
            assert_eq!(compare(&null, &null, ColumnType::Number, direction), Ordering::Equal);
        }
    }

    #[test]
    fn test_compare_text_case_insensitive() {
        let a = CellValue::Text("apple".into());
        let b = CellValue::Text("Banana".into());
        assert_eq!(compare(&a, &b, ColumnType::Text, SortDirection::Ascending), Ordering::Less);
        assert_eq!(compare(&a, &b, ColumnType::Text, SortDirection::Descending), Ordering::Greater);

        let upper = CellValue::Text("ALICE".into());
        let lower = CellValue::Text("alice".into());
        assert_eq!(compare(&upper, &lower, ColumnType::Text, SortDirection::Ascending), Ordering::Equal);
    }

    #[test]
    fn test_compare_dates_by_instant() {
        let early = coerce(&RawValue::from("2023-12-31"), ColumnType::Date);
        let late = coerce(&RawValue::from("2024-01-01T00:00:00Z"), ColumnType::Date);
        let junk = coerce(&RawValue::from("n/a"), ColumnType::Date);
        assert_eq!(compare(&early, &late, ColumnType::Date, SortDirection::Ascending), Ordering::Less);
        assert_eq!(compare(&junk, &early, ColumnType::Date, SortDirection::Descending), Ordering::Greater);
    }

    #[test]
    fn test_raw_value_deserializes_untagged() {
        let row: Vec<RawValue> = serde_json::from_str(r#"[null, 3, "x", true]"#).unwrap();
        assert_eq!(row, vec![
            RawValue::Empty,
            RawValue::Number(3.0),
            RawValue::Text("x".into()),
            RawValue::Bool(true),
        ]);
    }
}
