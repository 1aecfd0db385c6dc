use crate::error::SweeperError;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::SharedStrings;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::SpreadsheetError;
use crate::table::Column;
use crate::table::ColumnType;
use crate::table::Table;
use crate::table::Value;
use std::collections::HashSet;
use tracing::debug;

/// Largest number of positions the used range may cover.
/// A stray cell far from the data would otherwise expand the grid to billions of slots.
const MAX_GRID_CELLS: usize = 50_000_000;

/// Raw cells of one sheet (or of one delimited file) before typing.
/// The first used row holds the column names.
pub(crate) struct Sheet {
    /// Source file name
    pub(crate) file_name: String,
    /// Sheet name
    pub(crate) name: String,
    /// All non-empty cells in the sheet
    pub(crate) cells: Vec<Cell>,
    /// Actual data range (determined from cell data)
    pub(crate) row_lower_bound: Option<usize>,
    pub(crate) row_upper_bound: Option<usize>,
    pub(crate) col_lower_bound: Option<usize>,
    pub(crate) col_upper_bound: Option<usize>,
}

impl Sheet {
    /// Creates an empty sheet.
    pub(super) fn new(file_name: &str, name: &str) -> Self {
        Self {
            file_name: file_name.to_owned(),
            name: name.to_owned(),
            cells: Vec::new(),
            row_lower_bound: None,
            row_upper_bound: None,
            col_lower_bound: None,
            col_upper_bound: None,
        }
    }

    /// Returns true if the sheet covers no row at all.
    pub(crate) fn is_empty(&self) -> bool {
        self.row_lower_bound.is_none()
    }

    /// Adds a cell to the sheet, updating the data range.
    pub(super) fn push(&mut self, cell: Cell) {
        self.update_bound(cell.row, cell.col);
        self.cells.push(cell);
    }

    /// Extends the data range to a position that holds no cell,
    /// so that trailing empty fields and rows still count.
    pub(super) fn extend(&mut self, row: usize, col: usize) {
        self.update_bound(row, col);
    }

    /// Updates the actual data range boundaries based on cell positions.
    fn update_bound(&mut self, row: usize, col: usize) {
        if self.row_lower_bound.map(|row_lower_bound| row < row_lower_bound).unwrap_or(true) {
            self.row_lower_bound = Some(row);
        }
        if self.row_upper_bound.map(|row_upper_bound| row_upper_bound < row).unwrap_or(true) {
            self.row_upper_bound = Some(row);
        }
        if self.col_lower_bound.map(|col_lower_bound| col < col_lower_bound).unwrap_or(true) {
            self.col_lower_bound = Some(col);
        }
        if self.col_upper_bound.map(|col_upper_bound| col_upper_bound < col).unwrap_or(true) {
            self.col_upper_bound = Some(col);
        }
    }

    /// Fails when the used range covers more than [`MAX_GRID_CELLS`] positions.
    fn check_range(&self) -> Result<(), SpreadsheetError> {
        let (Some(row_lower), Some(row_upper), Some(col_lower), Some(col_upper)) = (
            self.row_lower_bound,
            self.row_upper_bound,
            self.col_lower_bound,
            self.col_upper_bound,
        ) else {
            return Ok(());
        };
        let cells = (row_upper - row_lower + 1) as u128 * (col_upper - col_lower + 1) as u128;
        if cells > MAX_GRID_CELLS as u128 {
            return Err(SpreadsheetError::RangeTooLarge {
                file: self.file_name.to_owned(),
                range: format!(
                    "{}:{}",
                    index_to_reference(row_lower, col_lower),
                    index_to_reference(row_upper, col_upper)
                ),
                cells,
                limit: MAX_GRID_CELLS,
            });
        }
        Ok(())
    }

    /// Lays the cells out as a dense grid over the data range.
    pub(crate) fn grid(&self) -> Vec<Vec<Option<&Cell>>> {
        let (Some(row_lower), Some(row_upper), Some(col_lower), Some(col_upper)) = (
            self.row_lower_bound,
            self.row_upper_bound,
            self.col_lower_bound,
            self.col_upper_bound,
        ) else {
            return Vec::new();
        };
        let mut grid = vec![vec![None; col_upper - col_lower + 1]; row_upper - row_lower + 1];
        for cell in &self.cells {
            grid[cell.row - row_lower][cell.col - col_lower] = Some(cell);
        }
        grid
    }

    /// Builds a typed table: the first row names the columns, every column
    /// gets the most specific type shared by its cells.
    pub(crate) fn to_table(&self, shared_strings: &SharedStrings) -> Result<Table, SweeperError> {
        if self.is_empty() {
            debug!("{}: sheet '{}' is empty", self.file_name, self.name);
            return Ok(Table::default());
        }
        self.check_range()?;
        let grid = self.grid();
        let Some((header, records)) = grid.split_first() else {
            return Ok(Table::default());
        };

        let names = header
            .iter()
            .enumerate()
            .map(|(index, cell)| -> Result<String, SweeperError> {
                let name = match cell {
                    Some(cell) => match self.convert(cell, ColumnType::Varchar, shared_strings)? {
                        Value::Text(name) => name,
                        _ => String::new(),
                    },
                    None => String::new(),
                };
                Ok(if name.is_empty() { format!("Unnamed: {index}") } else { name })
            })
            .collect::<Result<Vec<String>, SweeperError>>()?;

        let mut columns = Vec::with_capacity(names.len());
        for (index, name) in unique_names(names).into_iter().enumerate() {
            let kind = ColumnType::detect(
                records
                    .iter()
                    .map(|record| record[index].and_then(|cell| ColumnType::from(&cell.kind, &cell.value)))
                    .collect(),
            );
            let values = records
                .iter()
                .map(|record| match record[index] {
                    Some(cell) => self.convert(cell, kind, shared_strings),
                    None => Ok(Value::Null),
                })
                .collect::<Result<Vec<Value>, SweeperError>>()?;
            debug!("{}: column '{}' detected as {}", self.file_name, name, kind.as_str());
            columns.push(Column::new(&name, kind, values));
        }

        Ok(Table::new(columns, records.len())?)
    }

    fn convert(&self, cell: &Cell, kind: ColumnType, shared_strings: &SharedStrings) -> Result<Value, SweeperError> {
        cell.to_value(kind, shared_strings).map_err(|message| {
            SpreadsheetError::CellValueError(
                self.file_name.to_owned(),
                self.name.to_owned(),
                cell.reference(),
                message,
            )
            .into()
        })
    }
}

/// Makes column names unique by appending `.1`, `.2`, ... to repeated names.
pub(crate) fn unique_names(names: Vec<String>) -> Vec<String> {
    let mut used = HashSet::<String>::with_capacity(names.len());
    names
        .into_iter()
        .map(|name| {
            let mut candidate = name.to_owned();
            let mut suffix = 0usize;
            while used.contains(&candidate) {
                suffix += 1;
                candidate = format!("{name}.{suffix}");
            }
            used.insert(candidate.to_owned());
            candidate
        })
        .collect()
}
