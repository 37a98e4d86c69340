//! Read-only tabular data sources.
//!
//! A sheet arrives as a header row plus string cells in arbitrary column
//! order. Columns are looked up by exact name after trimming.

use crate::error::FetchError;
use csv::ReaderBuilder;
use std::path::{Path, PathBuf};

/// String-typed sheet contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Build a table, trimming every header name. Short rows are padded with
    /// empty cells so every row has one cell per header.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let headers: Vec<String> = headers.into_iter().map(|h| h.trim().to_string()).collect();
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut r| {
                if r.len() < width {
                    r.resize(width, String::new());
                }
                r
            })
            .collect();
        Self { headers, rows }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name.trim())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Something that can hand out sheets by name.
pub trait DataSource {
    fn fetch(&self, sheet: &str) -> Result<Table, FetchError>;
}

/// Reads `<dir>/<sheet>.csv`, the shape a spreadsheet CSV export takes on disk.
#[derive(Debug, Clone)]
pub struct CsvDirSource {
    dir: PathBuf,
}

impl CsvDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn sheet_path(&self, sheet: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", sheet))
    }
}

impl DataSource for CsvDirSource {
    fn fetch(&self, sheet: &str) -> Result<Table, FetchError> {
        let path = self.sheet_path(sheet);
        if !path.exists() {
            return Err(FetchError::NotFound { sheet: sheet.to_string(), path });
        }
        log::debug!("Reading sheet '{}' from {}", sheet, path.display());
        read_csv_table(sheet, &path)
    }
}

fn read_csv_table(sheet: &str, path: &Path) -> Result<Table, FetchError> {
    let csv_err = |source: csv::Error| FetchError::Csv { sheet: sheet.to_string(), source };
    let file = std::fs::File::open(path).map_err(|source| FetchError::Io { sheet: sheet.to_string(), source })?;
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(file);
    let headers: Vec<String> = rdr.headers().map_err(csv_err)?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(csv_err)?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(Table::new(headers, rows))
}
