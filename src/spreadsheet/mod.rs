//! # Spreadsheet Input Module
//!
//! Reads an uploaded file into a [`Table`]. Delimited text (`.csv`) and
//! Office Open XML workbooks (`.xlsx`) are supported; both readers first
//! collect raw cells into a [`sheet::Sheet`] and then share the same
//! header normalization and column type detection.
use crate::error::SweeperError;
use crate::table::Table;
use std::fmt::Display;
use std::path::Path;
use thiserror::Error;

pub(crate) mod cell;
mod csv;
mod excel;
pub(crate) mod reference;
pub(crate) mod sheet;
mod xlsx;

/// Errors raised while reading an input file.
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    /// The file extension is neither csv nor xlsx
    #[error("Unsupported file format '{}'", display_extension(.0))]
    UnsupportedFormat(String),

    /// A cell cannot be converted to the type detected for its column
    #[error("Invalid value in '{0}' sheet '{1}' at '{2}': {3}")]
    CellValueError(String, String, String, String),

    /// A required part of the workbook container is missing
    #[error("Missing workbook part '{0}'")]
    FileError(String),

    /// The workbook contains no worksheet
    #[error("Workbook '{0}' contains no worksheet")]
    SpreadsheetEmptyError(String),

    /// A delimited record has more fields than the header row
    #[error("Line {line} has {found} fields, expected at most {expected}")]
    RaggedRow {
        line: u64,
        expected: usize,
        found: usize,
    },

    /// The used range is too large to lay out as a table
    #[error("Data range {range} of '{file}' spans {cells} cells, more than the {limit} supported")]
    RangeTooLarge {
        file: String,
        range: String,
        cells: u128,
        limit: usize,
    },

    /// Delimited input without any record
    #[error("Missing header row")]
    MissingHeaderRow,
}

/// Input formats accepted by the readers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Xlsx,
}

impl FileFormat {
    /// Detects the format from the file name's extension, case-insensitively.
    ///
    /// # Errors
    ///
    /// `UnsupportedFormat` carrying the lowercase extension (empty when the name has none).
    pub fn detect(file_name: &str) -> Result<Self, SpreadsheetError> {
        let extension = extension(file_name);
        match extension.as_str() {
            "csv" => Ok(FileFormat::Csv),
            "xlsx" => Ok(FileFormat::Xlsx),
            _ => Err(SpreadsheetError::UnsupportedFormat(extension)),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Xlsx => "xlsx",
        }
    }

    /// Parses file content of this format into a table.
    ///
    /// # Arguments
    /// * `file_name` - Name used in messages
    /// * `bytes` - Whole file content
    pub fn read_table(&self, file_name: &str, bytes: &[u8]) -> Result<Table, SweeperError> {
        match self {
            FileFormat::Csv => csv::read_table(file_name, bytes),
            FileFormat::Xlsx => xlsx::read_table(file_name, bytes),
        }
    }
}

impl Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Returns the lowercase extension of a file name, or an empty string.
pub fn extension(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .map(|extension| extension.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Renders an extension the way messages show it: `.txt`, or `(none)`.
pub fn display_extension(extension: &str) -> String {
    if extension.is_empty() {
        "(none)".to_string()
    } else {
        format!(".{extension}")
    }
}
