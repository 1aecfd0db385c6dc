//! Comma-separated text reader.
use crate::error::SweeperError;
use crate::helpers::text::decode;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::cell::SharedStrings;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::SpreadsheetError;
use crate::table::Table;
use csv::ReaderBuilder;
use tracing::debug;

/// Name given to the single sheet of a delimited file in messages.
const SHEET_NAME: &str = "csv";

/// Reads comma-separated content into a table.
/// The first record is the header; shorter records are padded with missing values.
///
/// # Errors
///
/// Invalid text encoding, malformed records, records longer than the header,
/// or content without any record.
pub(super) fn read_table(file_name: &str, bytes: &[u8]) -> Result<Table, SweeperError> {
    let text = decode(bytes)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut sheet = Sheet::new(file_name, SHEET_NAME);
    let mut width = None::<usize>;
    for (row, result) in reader.records().enumerate() {
        let record = result?;
        match width {
            None => {
                width = Some(record.len());
                for (col, field) in record.iter().enumerate() {
                    sheet.push(Cell {
                        row,
                        col,
                        kind: CellType::InlineString,
                        value: field.to_owned(),
                    });
                }
            }
            Some(expected) if record.len() > expected => {
                let line = record.position().map(|position| position.line()).unwrap_or(row as u64 + 1);
                Err(SpreadsheetError::RaggedRow {
                    line,
                    expected,
                    found: record.len(),
                })?
            }
            Some(_) => {
                for (col, field) in record.iter().enumerate() {
                    let kind = CellType::sniff(field);
                    if kind != CellType::Empty {
                        sheet.push(Cell {
                            row,
                            col,
                            kind,
                            value: field.to_owned(),
                        });
                    }
                }
            }
        }
        sheet.extend(row, 0);
    }

    if width.is_none() {
        Err(SpreadsheetError::MissingHeaderRow)?
    }
    debug!("{}: read {} cells from delimited text", file_name, sheet.cells.len());
    sheet.to_table(&SharedStrings::default())
}
