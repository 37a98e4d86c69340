//! Error and warning types.
//!
//! Only [`FetchError`] stops a run. Schema and parse problems are reported
//! as [`Warning`] values next to the data they affected.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The data source could not deliver a usable table.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("sheet '{sheet}' not found at {}", path.display())]
    NotFound { sheet: String, path: PathBuf },

    #[error("failed to read sheet '{sheet}': {source}")]
    Io {
        sheet: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode sheet '{sheet}': {source}")]
    Csv {
        sheet: String,
        #[source]
        source: csv::Error,
    },

    #[error("sheet '{0}' contains no data rows")]
    Empty(String),

    #[error("none of the {rows} rows in sheet '{sheet}' could be used")]
    AllRowsUnparseable { sheet: String, rows: usize },
}

/// Top-level error for anything outside the pure compute core.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Configuration error in {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Recoverable problems found while normalizing a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// An expected column is absent; dependent filters yield no options.
    MissingColumn(String),
    /// A cell could not be parsed and was replaced by its default.
    Unparseable { row: usize, column: String, value: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::MissingColumn(col) => write!(f, "expected column '{}' is missing", col),
            Warning::Unparseable { row, column, value } => {
                write!(f, "row {}: could not parse {} value '{}'", row, column, value)
            }
        }
    }
}
