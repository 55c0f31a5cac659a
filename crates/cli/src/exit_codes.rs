//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain      | Description                                 |
//! |---------|-------------|---------------------------------------------|
//! | 0       | Universal   | Success                                     |
//! | 1       | Universal   | General error (unspecified)                 |
//! | 2       | Universal   | CLI usage error (bad args, unknown column)  |
//! | 3-9     | data        | Reading, validating and charting datasets   |
//! | 10-19   | ai          | AI provider and question codes              |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use datapacket_ask::AskError;
use datapacket_engine::error::ChartError;
use datapacket_io::ImportError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unknown column, unsupported file extension.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Data (3-9)
// =============================================================================

/// File could not be read or written.
pub const EXIT_IO: u8 = 3;

/// Source file is not valid CSV or spreadsheet data.
pub const EXIT_PARSE: u8 = 4;

/// Schema rejected: no data rows, empty or duplicate column names.
pub const EXIT_SCHEMA: u8 = 5;

/// Nothing to chart (no numeric column, or a non-numeric y-axis).
pub const EXIT_CHART: u8 = 6;

// =============================================================================
// AI (10-19)
// =============================================================================

/// AI disabled (provider=none).
pub const EXIT_AI_DISABLED: u8 = 10;

/// AI provider configured but API key missing.
pub const EXIT_AI_MISSING_KEY: u8 = 11;

/// The completion call failed (network, HTTP status, unreadable body).
pub const EXIT_AI_REQUEST: u8 = 12;

// =============================================================================
// Error mapping
// =============================================================================

pub fn import_exit_code(err: &ImportError) -> u8 {
    match err {
        ImportError::Io(_) => EXIT_IO,
        ImportError::UnsupportedFormat(_) => EXIT_USAGE,
        ImportError::Csv(_) | ImportError::Excel(_) | ImportError::EmptySheet => EXIT_PARSE,
        ImportError::NoData | ImportError::Schema(_) => EXIT_SCHEMA,
    }
}

pub fn chart_exit_code(err: &ChartError) -> u8 {
    match err {
        ChartError::UnknownColumn(_) => EXIT_USAGE,
        ChartError::NoNumericData | ChartError::NotNumeric(_) => EXIT_CHART,
    }
}

pub fn ask_exit_code(err: &AskError) -> u8 {
    match err {
        AskError::NotConfigured(_) => EXIT_AI_DISABLED,
        AskError::MissingKey => EXIT_AI_MISSING_KEY,
        AskError::Network(_) | AskError::Api { .. } | AskError::InvalidResponse(_) => EXIT_AI_REQUEST,
    }
}
