//! Per-file processing options and the JSON options document.
use crate::error::ResultMessage;
use crate::error::SweeperError;
use crate::export::ExportFormat;
use serde::Deserialize;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

/// Number of rows shown by a preview unless configured otherwise.
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

/// Resolved options for processing one file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileOptions {
    /// Delete rows equal to an earlier row
    pub remove_duplicates: bool,
    /// Replace missing numbers with the column mean
    pub fill_missing_numeric: bool,
    /// Columns to keep; `None` keeps all of them
    pub columns: Option<Vec<String>>,
    /// Target format of the artifact
    pub convert_to: ExportFormat,
    /// Number of rows shown by the preview
    pub preview_rows: usize,
    /// Whether to describe the columns after parsing
    pub describe: bool,
}

impl Default for FileOptions {
    fn default() -> Self {
        FileOptions {
            remove_duplicates: false,
            fill_missing_numeric: false,
            columns: None,
            convert_to: ExportFormat::default(),
            preview_rows: DEFAULT_PREVIEW_ROWS,
            describe: false,
        }
    }
}

/// Options given for one file in the options document.
/// Absent fields keep the value given on the command line.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileOverrides {
    pub remove_duplicates: Option<bool>,
    pub fill_missing_numeric: Option<bool>,
    pub columns: Option<Vec<String>>,
    pub convert_to: Option<ExportFormat>,
}

impl FileOverrides {
    /// Applies the present fields on top of the given options.
    pub fn apply(&self, defaults: &FileOptions) -> FileOptions {
        FileOptions {
            remove_duplicates: self.remove_duplicates.unwrap_or(defaults.remove_duplicates),
            fill_missing_numeric: self.fill_missing_numeric.unwrap_or(defaults.fill_missing_numeric),
            columns: self.columns.to_owned().or_else(|| defaults.columns.to_owned()),
            convert_to: self.convert_to.unwrap_or(defaults.convert_to),
            ..defaults.to_owned()
        }
    }
}

/// Per-file overrides keyed by file name.
///
/// ```json
/// {"files": {"report.csv": {"remove_duplicates": true, "columns": ["id"], "convert_to": "xlsx"}}}
/// ```
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionsDocument {
    #[serde(default)]
    pub files: HashMap<String, FileOverrides>,
}

impl OptionsDocument {
    /// Loads an options document from a JSON file.
    pub fn load(path: &Path) -> Result<Self, SweeperError> {
        let prefix = format!("Load options '{}' failed", path.display());
        let text = std::fs::read_to_string(path)
            .map_err(SweeperError::from)
            .with_prefix(&prefix)?;
        Self::parse(&text).with_prefix(&prefix)
    }

    /// Parses an options document from JSON text.
    pub fn parse(text: &str) -> Result<Self, SweeperError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Resolves the options of one file: its overrides, if any, on top of the defaults.
    pub fn options_for(&self, file_name: &str, defaults: &FileOptions) -> FileOptions {
        match self.files.get(file_name) {
            Some(overrides) => overrides.apply(defaults),
            None => defaults.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults() {
        let options = FileOptions::default();
        assert!(!options.remove_duplicates);
        assert!(!options.fill_missing_numeric);
        assert_eq!(options.columns, None);
        assert_eq!(options.convert_to, ExportFormat::Csv);
        assert_eq!(options.preview_rows, 5);
    }

    #[test]
    fn overrides_apply_per_file() {
        let document = OptionsDocument::parse(
            r#"{"files": {"a.csv": {"fill_missing_numeric": true, "columns": ["x"], "convert_to": "xlsx"}}}"#,
        )
        .unwrap();
        let defaults = FileOptions {
            remove_duplicates: true,
            preview_rows: 2,
            ..FileOptions::default()
        };

        let options = document.options_for("a.csv", &defaults);
        assert_eq!(options, FileOptions {
            remove_duplicates: true,
            fill_missing_numeric: true,
            columns: Some(vec!["x".to_string()]),
            convert_to: ExportFormat::Xlsx,
            preview_rows: 2,
            describe: false,
        });
        assert_eq!(document.options_for("b.csv", &defaults), defaults);
    }

    #[test]
    fn empty_document() {
        assert_eq!(OptionsDocument::parse("{}").unwrap(), OptionsDocument::default());
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(OptionsDocument::parse(r#"{"files": {"a.csv": {"dedupe": true}}}"#).is_err());
        assert!(OptionsDocument::parse(r#"{"files": {"a.csv": {"convert_to": "pdf"}}}"#).is_err());
    }

    #[test]
    fn load_reports_path() {
        let error = OptionsDocument::load(Path::new("/nonexistent/options.json")).unwrap_err();
        assert!(error.to_string().starts_with("Load options '/nonexistent/options.json' failed: "), "{error}");
    }
}
