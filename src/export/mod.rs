//! # Export Module
//!
//! Serializes a [`Table`] into an in-memory artifact: the output bytes, the
//! file name to deliver them under and their mime type.
use crate::error::SweeperError;
use crate::table::Table;
use serde::Deserialize;
use serde::Serialize;
use std::fmt::Display;
use std::path::Path;
use thiserror::Error;

mod csv;
mod xlsx;

/// Errors raised while writing an artifact.
#[derive(Error, Debug)]
pub enum ExportError {
    /// The table has more rows than a worksheet can hold
    #[error("{rows} rows exceed the worksheet limit of {limit}")]
    TooManyRows { rows: usize, limit: usize },

    /// The table has more columns than a worksheet can hold
    #[error("{columns} columns exceed the worksheet limit of {limit}")]
    TooManyColumns { columns: usize, limit: usize },

    /// A date lies outside the range of workbook serial numbers
    #[error("Column '{column}' row {row}: {value} is outside the dates a workbook can hold (1899-12-31 to 9999-12-31)")]
    DateOutOfRange { column: String, row: usize, value: String },
}

/// Output formats of the writers.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Comma-separated values
    #[default]
    Csv,
    /// Excel workbook
    Xlsx,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }
}

impl Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Serialized table ready for delivery.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportArtifact {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime_type: &'static str,
}

/// Replaces the extension of the uploaded file name with the one of the target format.
pub fn output_filename(file_name: &str, format: ExportFormat) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{stem}.{}", format.extension())
}

/// Serializes the table in the target format.
///
/// # Arguments
/// * `table` - Table to write, all of its columns in order
/// * `file_name` - Name of the uploaded file the table came from
/// * `format` - Target format
pub fn export(table: &Table, file_name: &str, format: ExportFormat) -> Result<ExportArtifact, SweeperError> {
    let bytes = match format {
        ExportFormat::Csv => csv::write_table(table)?,
        ExportFormat::Xlsx => xlsx::write_table(table)?,
    };
    Ok(ExportArtifact {
        bytes,
        filename: output_filename(file_name, format),
        mime_type: format.mime_type(),
    })
}
