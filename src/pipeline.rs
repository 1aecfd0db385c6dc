//! # Pipeline Module
//!
//! Drives one uploaded file through parsing, preview, cleaning, column
//! selection and export. Every file gets its own [`FileContext`]; nothing is
//! shared between the files of a batch, so a failing file never affects the
//! others.
//!
//! The context enforces the order of the steps:
//!
//! ```text
//! Uploaded -> Parsed -> (Cleaned)* -> ColumnSelected -> Exported
//!        \-> Rejected
//! ```
use crate::config::FileOptions;
use crate::error::SweeperError;
use crate::export::export;
use crate::export::ExportArtifact;
use crate::export::ExportFormat;
use crate::spreadsheet::extension;
use crate::spreadsheet::FileFormat;
use crate::spreadsheet::SpreadsheetError;
use crate::table::ColumnSummary;
use crate::table::Preview;
use crate::table::Table;
use std::fmt::Display;
use thiserror::Error;
use tracing::debug;
use tracing::info;
use tracing::warn;

/// Errors raised by the processing steps of a file.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The file is neither csv nor xlsx
    #[error("{}", unsupported_message(.0))]
    UnsupportedFormat(String),

    /// The content could not be read as a table
    #[error("Could not read '{name}': {message}")]
    UnparsableFile { name: String, message: String },

    /// A step was requested out of order
    #[error("Cannot {operation} when the file is {state}")]
    InvalidState {
        operation: &'static str,
        state: FileState,
    },
}

fn unsupported_message(extension: &str) -> String {
    if extension.is_empty() {
        "Sorry, files without an extension are not supported!".to_string()
    } else {
        format!("Sorry, .{extension} files are not supported!")
    }
}

/// A file as supplied by the user. Read-only once created.
#[derive(Clone, Debug, PartialEq)]
pub struct UploadedFile {
    pub name: String,
    pub content: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: &str, content: Vec<u8>) -> Self {
        UploadedFile {
            name: name.to_owned(),
            content,
        }
    }

    /// Lowercase extension of the file name, empty when there is none.
    pub fn extension(&self) -> String {
        extension(&self.name)
    }

    pub fn size_bytes(&self) -> usize {
        self.content.len()
    }
}

/// Processing state of a file.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FileState {
    Uploaded,
    Parsed,
    Cleaned,
    ColumnSelected,
    Exported,
    Rejected,
}

impl Display for FileState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FileState::Uploaded => "uploaded",
            FileState::Parsed => "parsed",
            FileState::Cleaned => "cleaned",
            FileState::ColumnSelected => "reduced to selected columns",
            FileState::Exported => "exported",
            FileState::Rejected => "rejected",
        };
        write!(f, "{name}")
    }
}

/// States in which the table can still be inspected, cleaned or exported.
const LOADED: [FileState; 3] = [FileState::Parsed, FileState::Cleaned, FileState::ColumnSelected];
/// States in which cleaning is allowed.
const CLEANABLE: [FileState; 2] = [FileState::Parsed, FileState::Cleaned];

/// Processing context of a single file.
pub struct FileContext {
    file: UploadedFile,
    state: FileState,
    table: Option<Table>,
}

impl FileContext {
    pub fn new(file: UploadedFile) -> Self {
        FileContext {
            file,
            state: FileState::Uploaded,
            table: None,
        }
    }

    pub fn file(&self) -> &UploadedFile {
        &self.file
    }

    pub fn state(&self) -> FileState {
        self.state
    }

    /// The parsed table, until the file is exported.
    pub fn table(&self) -> Option<&Table> {
        self.table.as_ref()
    }

    fn require(&self, operation: &'static str, allowed: &[FileState]) -> Result<(), PipelineError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(PipelineError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn loaded_table(&self, operation: &'static str, allowed: &[FileState]) -> Result<&Table, PipelineError> {
        self.require(operation, allowed)?;
        self.table.as_ref().ok_or(PipelineError::InvalidState {
            operation,
            state: self.state,
        })
    }

    fn loaded_table_mut(&mut self, operation: &'static str, allowed: &[FileState]) -> Result<&mut Table, PipelineError> {
        self.require(operation, allowed)?;
        let state = self.state;
        self.table.as_mut().ok_or(PipelineError::InvalidState { operation, state })
    }

    /// Detects the format from the file extension and parses the content.
    ///
    /// # Errors
    ///
    /// `UnsupportedFormat` or `UnparsableFile`; the file is rejected in both cases
    /// and accepts no further operation.
    pub fn parse(&mut self) -> Result<&Table, SweeperError> {
        self.require("parse", &[FileState::Uploaded])?;
        let format = match FileFormat::detect(&self.file.name) {
            Ok(format) => format,
            Err(SpreadsheetError::UnsupportedFormat(extension)) => {
                self.state = FileState::Rejected;
                warn!("{}: unsupported format", self.file.name);
                return Err(PipelineError::UnsupportedFormat(extension).into());
            }
            Err(error) => {
                self.state = FileState::Rejected;
                return Err(error.into());
            }
        };

        match format.read_table(&self.file.name, &self.file.content) {
            Ok(table) => {
                info!(
                    "{}: parsed {} rows and {} columns as {}",
                    self.file.name,
                    table.row_count(),
                    table.column_count(),
                    format
                );
                self.state = FileState::Parsed;
                Ok(&*self.table.insert(table))
            }
            Err(error) => {
                self.state = FileState::Rejected;
                warn!("{}: {}", self.file.name, error);
                Err(PipelineError::UnparsableFile {
                    name: self.file.name.to_owned(),
                    message: error.to_string(),
                }
                .into())
            }
        }
    }

    /// Returns the first `rows` rows of the table.
    pub fn preview(&self, rows: usize) -> Result<Preview<'_>, SweeperError> {
        Ok(self.loaded_table("preview", &LOADED)?.preview(rows))
    }

    /// Describes the columns of the table.
    pub fn describe(&self) -> Result<Vec<ColumnSummary>, SweeperError> {
        Ok(self.loaded_table("describe", &LOADED)?.describe())
    }

    /// Removes duplicate rows, returning how many were removed.
    pub fn remove_duplicates(&mut self) -> Result<usize, SweeperError> {
        let removed = self.loaded_table_mut("remove duplicates", &CLEANABLE)?.remove_duplicates();
        self.state = FileState::Cleaned;
        info!("{}: removed {} duplicate rows", self.file.name, removed);
        Ok(removed)
    }

    /// Fills missing numbers with their column mean, returning how many cells were filled.
    pub fn fill_missing_numeric(&mut self) -> Result<usize, SweeperError> {
        let filled = self.loaded_table_mut("fill missing numbers", &CLEANABLE)?.fill_missing_numeric();
        self.state = FileState::Cleaned;
        info!("{}: filled {} missing numbers", self.file.name, filled);
        Ok(filled)
    }

    /// Keeps only the named columns. A second selection narrows further.
    ///
    /// # Errors
    ///
    /// `UnknownColumn` when a name is not a column of the table; the table is unchanged.
    pub fn select_columns<S: AsRef<str>>(&mut self, names: &[S]) -> Result<&Table, SweeperError> {
        let table = self.loaded_table_mut("select columns", &LOADED)?;
        table.select_columns(names)?;
        let selected = table.column_names();
        debug!("{}: selected columns {:?}", self.file.name, selected);
        self.state = FileState::ColumnSelected;
        Ok(self.loaded_table("select columns", &LOADED)?)
    }

    /// Serializes the table. Exporting without a selection keeps all columns.
    /// The table is released afterwards.
    pub fn export(&mut self, format: ExportFormat) -> Result<ExportArtifact, SweeperError> {
        let artifact = export(self.loaded_table("export", &LOADED)?, &self.file.name, format)?;
        self.state = FileState::Exported;
        self.table = None;
        info!("{}: exported {} bytes as {}", self.file.name, artifact.bytes.len(), artifact.filename);
        Ok(artifact)
    }
}

/// User-visible messages produced while processing files.
#[derive(Clone, Debug, PartialEq)]
pub enum Notice {
    /// Name and size of a parsed file
    FileInfo { name: String, size_bytes: usize },
    /// Announces the preview grid
    Preview { rows: usize },
    DuplicatesRemoved(usize),
    MissingFilled(usize),
    /// An artifact is ready for delivery
    Converted { filename: String, format: ExportFormat },
    /// A file could not be processed
    Failed(String),
    /// Every file of the batch has been handled
    AllReady,
}

impl Notice {
    pub fn is_error(&self) -> bool {
        matches!(self, Notice::Failed(_))
    }
}

impl Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::FileInfo { name, size_bytes } => {
                write!(f, "File: {}\nSize: {:.1} KB", name, *size_bytes as f64 / 1024f64)
            }
            Notice::Preview { rows } => write!(f, "Here is the first {rows} rows:"),
            Notice::DuplicatesRemoved(_) => write!(f, "Duplicates are gone!"),
            Notice::MissingFilled(_) => write!(f, "Missing numbers filled!"),
            Notice::Converted { filename, format } => {
                let label = match format {
                    ExportFormat::Csv => "CSV",
                    ExportFormat::Xlsx => "Excel",
                };
                write!(f, "Download as {label}: {filename}")
            }
            Notice::Failed(message) => write!(f, "{message}"),
            Notice::AllReady => write!(f, "All files are ready!"),
        }
    }
}

/// Everything produced for one file.
#[derive(Debug)]
pub struct FileReport {
    pub name: String,
    pub notices: Vec<Notice>,
    /// Rendered preview grid, when the file was parsed
    pub preview: Option<String>,
    /// Column descriptions, when requested
    pub description: Option<Vec<ColumnSummary>>,
    pub artifact: Option<ExportArtifact>,
    pub error: Option<SweeperError>,
}

impl FileReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Reports of a batch, in input order.
#[derive(Debug)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
    pub notices: Vec<Notice>,
}

impl BatchReport {
    pub fn failed(&self) -> usize {
        self.files.iter().filter(|file| !file.is_success()).count()
    }
}

/// Runs every step for one file: parse, preview, optional description,
/// optional cleaning, column selection and export.
pub fn process(file: UploadedFile, options: &FileOptions) -> FileReport {
    let mut report = FileReport {
        name: file.name.to_owned(),
        notices: Vec::new(),
        preview: None,
        description: None,
        artifact: None,
        error: None,
    };
    match run(FileContext::new(file), options, &mut report) {
        Ok(artifact) => report.artifact = Some(artifact),
        Err(error) => {
            report.notices.push(Notice::Failed(error.to_string()));
            report.error = Some(error);
        }
    }
    report
}

fn run(mut context: FileContext, options: &FileOptions, report: &mut FileReport) -> Result<ExportArtifact, SweeperError> {
    context.parse()?;
    report.notices.push(Notice::FileInfo {
        name: context.file().name.to_owned(),
        size_bytes: context.file().size_bytes(),
    });

    let preview = context.preview(options.preview_rows)?;
    report.notices.push(Notice::Preview { rows: options.preview_rows });
    report.preview = Some(preview.to_string());
    if options.describe {
        report.description = Some(context.describe()?);
    }

    if options.remove_duplicates {
        let removed = context.remove_duplicates()?;
        report.notices.push(Notice::DuplicatesRemoved(removed));
    }
    if options.fill_missing_numeric {
        let filled = context.fill_missing_numeric()?;
        report.notices.push(Notice::MissingFilled(filled));
    }
    if let Some(columns) = &options.columns {
        context.select_columns(columns)?;
    }

    let artifact = context.export(options.convert_to)?;
    report.notices.push(Notice::Converted {
        filename: artifact.filename.to_owned(),
        format: options.convert_to,
    });
    Ok(artifact)
}

/// Processes the files one after another, each with its own options.
pub fn process_batch<F>(files: Vec<UploadedFile>, options_for: F) -> BatchReport
where
    F: Fn(&str) -> FileOptions,
{
    let mut notices = Vec::new();
    let is_empty = files.is_empty();
    let files: Vec<FileReport> = files
        .into_iter()
        .map(|file| {
            let options = options_for(&file.name);
            process(file, &options)
        })
        .collect();
    if !is_empty {
        notices.push(Notice::AllReady);
    }
    BatchReport { files, notices }
}
