//! # Table Module
//!
//! The in-memory, column-oriented table produced by the readers and consumed
//! by the writers, together with the operations applied between the two:
//! cleaning, column selection, preview and column description.
use std::collections::HashSet;
use std::fmt::Display;
use thiserror::Error;

pub mod clean;
pub mod column;
pub mod value;

pub use column::{Column, ColumnType};
pub use value::Value;

/// Errors raised by table operations.
#[derive(Error, Debug)]
pub enum TableError {
    /// A selected column does not exist in the table
    #[error("Unknown column '{0}'")]
    UnknownColumn(String),

    /// A column's length disagrees with the table's row count
    #[error("Column '{name}' has {found} values, expected {expected}")]
    RaggedColumn {
        name: String,
        expected: usize,
        found: usize,
    },
}

/// An ordered sequence of named columns of equal length.
///
/// The row count is stored separately so that a table reduced to zero
/// columns still knows how many rows it has.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows: usize,
}

impl Table {
    /// Creates a table from columns, checking that all of them hold `rows` values.
    pub fn new(columns: Vec<Column>, rows: usize) -> Result<Self, TableError> {
        if let Some(column) = columns.iter().find(|column| column.values.len() != rows) {
            return Err(TableError::RaggedColumn {
                name: column.name.to_owned(),
                expected: rows,
                found: column.values.len(),
            });
        }
        Ok(Table { columns, rows })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|column| column.name.to_owned()).collect()
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns the values of one row, in column order.
    pub fn row(&self, index: usize) -> Option<Vec<&Value>> {
        if index < self.rows {
            Some(self.columns.iter().map(|column| &column.values[index]).collect())
        } else {
            None
        }
    }

    /// Reduces the table to the named columns, keeping the table's own column order.
    ///
    /// Selection order and repeated names are ignored. An empty selection
    /// leaves a table with no columns but the same row count.
    ///
    /// # Errors
    ///
    /// Returns `UnknownColumn` for the first name that is not a column of the table;
    /// the table is left unchanged in that case.
    pub fn select_columns<S: AsRef<str>>(&mut self, names: &[S]) -> Result<(), TableError> {
        let selected: HashSet<&str> = names.iter().map(|name| name.as_ref()).collect();
        if let Some(unknown) = names
            .iter()
            .map(|name| name.as_ref())
            .find(|name| self.column(name).is_none())
        {
            return Err(TableError::UnknownColumn(unknown.to_owned()));
        }
        self.columns.retain(|column| selected.contains(column.name.as_str()));
        Ok(())
    }

    /// Returns a read-only view of the first `rows` rows.
    pub fn preview(&self, rows: usize) -> Preview<'_> {
        Preview {
            table: self,
            rows: rows.min(self.rows),
        }
    }

    /// Describes every column: name, inferred type and missing-value count.
    pub fn describe(&self) -> Vec<ColumnSummary> {
        self.columns
            .iter()
            .map(|column| ColumnSummary {
                name: column.name.to_owned(),
                kind: column.kind,
                nulls: column.null_count(),
            })
            .collect()
    }

    pub(crate) fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    /// Keeps only the rows whose flag is true.
    pub(crate) fn retain_rows(&mut self, keep: &[bool]) {
        for column in &mut self.columns {
            let mut flags = keep.iter();
            column.values.retain(|_| *flags.next().unwrap_or(&true));
        }
        self.rows = keep.iter().filter(|flag| **flag).count();
    }
}

/// Summary of a single column, as returned by [`Table::describe`].
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnSummary {
    pub name: String,
    pub kind: ColumnType,
    pub nulls: usize,
}

/// The first rows of a table, rendered as an aligned text grid.
pub struct Preview<'a> {
    table: &'a Table,
    rows: usize,
}

impl Preview<'_> {
    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// Header followed by the previewed rows, each cell already formatted.
    pub fn cells(&self) -> Vec<Vec<String>> {
        let mut lines = vec![self.table.column_names()];
        for index in 0..self.rows {
            if let Some(row) = self.table.row(index) {
                lines.push(row.iter().map(|value| value.to_string()).collect());
            }
        }
        lines
    }
}

impl Display for Preview<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lines = self.cells();
        let widths: Vec<usize> = (0..self.table.column_count())
            .map(|col| {
                lines
                    .iter()
                    .map(|line| line[col].chars().count())
                    .max()
                    .unwrap_or(0)
            })
            .collect();
        for line in &lines {
            let cells: Vec<String> = line
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{cell:<width$}"))
                .collect();
            writeln!(f, "{}", cells.join(" | ").trim_end())?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    pub(crate) fn sample() -> Table {
        Table::new(
            vec![
                Column::new("id", ColumnType::BigInt, vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
                Column::new(
                    "name",
                    ColumnType::Varchar,
                    vec![Value::Text("ann".into()), Value::Null, Value::Text("cy".into())],
                ),
                Column::new("score", ColumnType::Double, vec![Value::Double(1.5), Value::Null, Value::Double(2.0)]),
            ],
            3,
        )
        .unwrap()
    }

    #[test]
    fn rejects_ragged_columns() {
        let error = Table::new(vec![Column::new("a", ColumnType::BigInt, vec![Value::Int(1)])], 2).unwrap_err();
        assert_eq!(error.to_string(), "Column 'a' has 1 values, expected 2");
    }

    #[test]
    fn select_keeps_table_order() {
        let mut table = sample();
        table.select_columns(&["score", "id"]).unwrap();
        assert_eq!(table.column_names(), vec!["id", "score"]);
        assert_eq!(table.row_count(), 3);
    }

    #[test]
    fn select_all_is_unchanged() {
        let mut table = sample();
        let names = table.column_names();
        table.select_columns(&names).unwrap();
        assert_eq!(table, sample());
    }

    #[test]
    fn select_twice_is_idempotent() {
        let mut once = sample();
        once.select_columns(&["name"]).unwrap();
        let mut twice = once.clone();
        twice.select_columns(&["name"]).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn select_nothing_keeps_rows() {
        let mut table = sample();
        table.select_columns::<&str>(&[]).unwrap();
        assert_eq!(table.column_count(), 0);
        assert_eq!(table.row_count(), 3);
    }

    #[test]
    fn select_unknown_column_fails_without_change() {
        let mut table = sample();
        let error = table.select_columns(&["id", "missing"]).unwrap_err();
        assert_eq!(error.to_string(), "Unknown column 'missing'");
        assert_eq!(table, sample());
    }

    #[test]
    fn preview_is_bounded() {
        let table = sample();
        assert_eq!(table.preview(5).row_count(), 3);
        assert_eq!(table.preview(2).row_count(), 2);
        assert_eq!(
            table.preview(2).cells(),
            vec![
                vec!["id".to_string(), "name".to_string(), "score".to_string()],
                vec!["1".to_string(), "ann".to_string(), "1.5".to_string()],
                vec!["2".to_string(), "".to_string(), "".to_string()],
            ]
        );
    }

    #[test]
    fn preview_renders_aligned_grid() {
        let table = sample();
        let text = table.preview(1).to_string();
        assert_eq!(text, "id | name | score\n1  | ann  | 1.5\n");
    }

    #[test]
    fn describe_reports_types_and_nulls() {
        let summary = sample().describe();
        assert_eq!(summary[1], ColumnSummary {
            name: "name".to_string(),
            kind: ColumnType::Varchar,
            nulls: 1,
        });
        assert_eq!(summary[2].kind, ColumnType::Double);
    }
}
