use crate::error::SweeperError;
use crate::helpers::xml::attribute;
use crate::helpers::xml::parse_attribute;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::cell::SharedStrings;
use crate::spreadsheet::excel;
use crate::spreadsheet::excel::load_relationships;
use crate::spreadsheet::excel::open_part;
use crate::spreadsheet::excel::require_part;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::SpreadsheetError;
use crate::table::Table;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::collections::HashMap;
use std::collections::HashSet;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use tracing::debug;
use zip::ZipArchive;

// XML tag names of the SpreadsheetML parts
const TAG_CUSTOM_FORMATS: QName = QName(b"numFmts"); // Custom number formats container
const TAG_CUSTOM_FORMAT: QName = QName(b"numFmt");   // Individual custom number format
const TAG_FORMAT_INDEXES: QName = QName(b"cellXfs");  // Cell format indexes container
const TAG_FORMAT_INDEX: QName = QName(b"xf");         // Individual cell format index
const TAG_SHARED_STRING_ITEM: QName = QName(b"si");   // Shared string table item
const TAG_WORKBOOK_PROPERTIES: QName = QName(b"workbookPr"); // Workbook properties
const TAG_SHEET: QName = QName(b"sheet");             // Worksheet definition
const TAG_ROW: QName = QName(b"row");                 // Row in worksheet
const TAG_CELL: QName = QName(b"c");                  // Cell in worksheet
const TAG_INLINE_STRING: QName = QName(b"is");        // Inline string value
const TAG_VALUE: QName = QName(b"v");                 // Cell value content

/// Reads the first worksheet of an xlsx workbook into a table.
///
/// The first used row of the worksheet holds the column names. Only the
/// shared strings the worksheet refers to are loaded.
///
/// # Arguments
/// * `file_name` - Name used in messages
/// * `bytes` - Whole workbook content
pub(super) fn read_table(file_name: &str, bytes: &[u8]) -> Result<Table, SweeperError> {
    let mut zip = ZipArchive::new(Cursor::new(bytes))?;
    let (sheets, is_1904) = load_workbook(&mut zip)?;
    let Some((sheet_name, zip_path)) = sheets.into_iter().next() else {
        return Err(SpreadsheetError::SpreadsheetEmptyError(file_name.to_owned()).into());
    };
    let number_formats = load_number_formats(&mut zip, is_1904)?;
    let sheet = read_sheet(&mut zip, file_name, &sheet_name, &zip_path, &number_formats)?;

    let indexes: HashSet<usize> = sheet
        .cells
        .iter()
        .filter(|cell| cell.kind == CellType::SharedString)
        .filter_map(|cell| cell.value.trim().parse::<usize>().ok())
        .collect();
    let shared_strings = if indexes.is_empty() {
        SharedStrings::default()
    } else {
        load_shared_strings(&mut zip, indexes)?
    };
    debug!(
        "{}: sheet '{}' has {} cells, {} shared strings, 1904 date system: {}",
        file_name,
        sheet_name,
        sheet.cells.len(),
        shared_strings.strings.len(),
        is_1904
    );
    sheet.to_table(&shared_strings)
}

/// Maps the `t` attribute of a cell to the kind of its value.
fn cell_kind(kind: Option<&str>) -> CellType {
    match kind {
        Some("inlineStr" | "str") => CellType::InlineString,
        Some("s") => CellType::SharedString,
        Some("d") => CellType::IsoDateTime,
        Some("b") => CellType::Boolean,
        Some("e") => CellType::Error,
        _ => CellType::Number,
    }
}

/// Collects the raw cells of one worksheet.
/// Error cells (`#DIV/0!`, `#N/A`, ...) count towards the data range but carry no value.
fn read_sheet<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
    file_name: &str,
    sheet_name: &str,
    zip_path: &str,
    number_formats: &[CellType],
) -> Result<Sheet, SweeperError> {
    let mut sheet = Sheet::new(file_name, sheet_name);
    let mut reader = require_part(zip, zip_path)?;
    // Position of the next row and cell when the `r` attribute is left out
    let mut next_row = 0usize;
    let mut next_col = 0usize;
    let mut current: Option<Cell> = None;
    while let Some(event) = reader.next()? {
        match event {
            Event::Start(tag) if tag.name() == TAG_ROW => {
                if let Some(number) = parse_attribute::<usize>(&tag, "r")? {
                    next_row = number.saturating_sub(1);
                }
                next_col = 0;
            }
            Event::End(tag) if tag.name() == TAG_ROW => next_row += 1,
            Event::Start(tag) if tag.name() == TAG_CELL => {
                let (row, col) = attribute(&tag, "r")?
                    .and_then(|reference| reference_to_index(&reference))
                    .unwrap_or((next_row, next_col));
                next_col = col + 1;
                let mut kind = cell_kind(attribute(&tag, "t")?.as_deref());
                if kind == CellType::Number {
                    if let Some(style) = attribute(&tag, "s")?.filter(|style| !style.is_empty()) {
                        kind = number_formats
                            .get(style.parse::<usize>()?)
                            .copied()
                            .unwrap_or(CellType::Number);
                    }
                }
                current = Some(Cell {
                    row,
                    col,
                    kind,
                    value: String::new(),
                });
            }
            Event::Start(tag) if tag.name() == TAG_INLINE_STRING => {
                let value = reader.read_text(TAG_INLINE_STRING, false)?;
                if let Some(cell) = current.as_mut() {
                    cell.value = value;
                }
            }
            Event::Start(tag) if tag.name() == TAG_VALUE => {
                let value = reader.read_text(TAG_VALUE, true)?;
                if let Some(cell) = current.as_mut() {
                    cell.value = value;
                }
            }
            Event::End(tag) if tag.name() == TAG_CELL => match current.take() {
                Some(cell) if cell.kind == CellType::Error => sheet.extend(cell.row, cell.col),
                Some(cell) if !cell.value.is_empty() => sheet.push(cell),
                _ => (),
            },
            _ => (),
        }
    }
    Ok(sheet)
}

/// Loads the selected items of the shared string table
///
/// # Arguments
/// * `indexes` - Ids of the strings referenced by the worksheet
///
/// # Returns
/// The loaded strings with a mapping from their ids to positions
fn load_shared_strings<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
    mut indexes: HashSet<usize>,
) -> Result<SharedStrings, SweeperError> {
    let mut shared_strings = SharedStrings::default();
    let Some(mut reader) = open_part(zip, "xl/sharedStrings.xml")? else {
        return Ok(shared_strings);
    };

    let mut id = 0usize;
    while let Some(event) = reader.next()? {
        let Event::Start(tag) = event else {
            continue;
        };
        if tag.name() != TAG_SHARED_STRING_ITEM {
            continue;
        }
        if indexes.remove(&id) {
            let string = reader.read_text(TAG_SHARED_STRING_ITEM, false)?;
            shared_strings.mappings.insert(id, shared_strings.strings.len());
            shared_strings.strings.push(string);
            if indexes.is_empty() {
                break;
            }
        }
        id += 1;
    }
    Ok(shared_strings)
}

/// Loads the worksheet list and the date system of the workbook
///
/// # Returns
/// Tuple of (worksheets, is_1904_date_system) where worksheets are (name, zip_path) pairs in workbook order
fn load_workbook<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<(Vec<(String, String)>, bool), SweeperError> {
    let relationships = load_relationships(zip, "xl/_rels/workbook.xml.rels")?;
    let mut reader = require_part(zip, "xl/workbook.xml")?;
    let mut sheets: Vec<(String, String)> = Vec::new();
    let mut is_1904 = false;
    while let Some(event) = reader.next()? {
        match event {
            Event::Start(tag) if tag.name() == TAG_SHEET => {
                let name = attribute(&tag, "name")?;
                let path = attribute(&tag, "id")?.and_then(|id| relationships.get(&id));
                if let Some((name, path)) = name.zip(path) {
                    sheets.push((name, path.to_owned()));
                }
            }
            Event::Start(tag) if tag.name() == TAG_WORKBOOK_PROPERTIES => {
                is_1904 = matches!(attribute(&tag, "date1904")?.as_deref(), Some("1" | "true"));
            }
            _ => (),
        }
    }
    Ok((sheets, is_1904))
}

/// Loads number formats and cell styles from the styles part
///
/// # Returns
/// Cell types indexed by style id; empty when the workbook has no styles
fn load_number_formats<RS: Read + Seek>(zip: &mut ZipArchive<RS>, is_1904: bool) -> Result<Vec<CellType>, SweeperError> {
    let Some(mut reader) = open_part(zip, "xl/styles.xml")? else {
        return Ok(Vec::new());
    };

    let mut custom_formats = HashMap::<String, CellType>::new();
    let mut format_indexes = Vec::<String>::new();
    let mut in_custom_formats = false;
    let mut in_format_indexes = false;
    while let Some(event) = reader.next()? {
        match event {
            Event::Start(tag) if tag.name() == TAG_CUSTOM_FORMATS => in_custom_formats = true,
            Event::End(tag) if tag.name() == TAG_CUSTOM_FORMATS => in_custom_formats = false,
            Event::Start(tag) if tag.name() == TAG_FORMAT_INDEXES => in_format_indexes = true,
            // Cell styles follow the custom formats, nothing after them matters
            Event::End(tag) if tag.name() == TAG_FORMAT_INDEXES => break,
            Event::Start(tag) if in_custom_formats && tag.name() == TAG_CUSTOM_FORMAT => {
                if let (Some(id), Some(format)) = (attribute(&tag, "numFmtId")?, attribute(&tag, "formatCode")?) {
                    custom_formats.insert(id, CellType::parse_custom_number_format(&format, is_1904));
                }
            }
            Event::Start(tag) if in_format_indexes && tag.name() == TAG_FORMAT_INDEX => {
                format_indexes.push(attribute(&tag, "numFmtId")?.unwrap_or_default());
            }
            _ => (),
        }
    }

    Ok(excel::load_number_formats(format_indexes, custom_formats, is_1904))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ColumnType;
    use crate::table::Value;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/>
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="/xl/worksheets/sheet1.xml"/>
</Relationships>"#;

    const STYLES: &str = r#"<styleSheet>
<numFmts count="1"><numFmt numFmtId="164" formatCode="yyyy\-mm\-dd;@"/></numFmts>
<cellXfs count="4"><xf numFmtId="0"/><xf numFmtId="164"/><xf numFmtId="20"/><xf numFmtId="22"/></cellXfs>
</styleSheet>"#;

    const SHARED_STRINGS: &str = r#"<sst count="4" uniqueCount="4">
<si><t>name</t></si>
<si><r><t>An</t></r><r><t>n</t></r><rPh><t>アン</t></rPh></si>
<si><t xml:space="preserve">Bob &amp; co</t></si>
<si><t>unused</t></si>
</sst>"#;

    /// Builds an xlsx package from `(path, content)` parts.
    fn package(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (path, content) in parts {
            writer.start_file(*path, SimpleFileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn workbook(properties: &str, first_sheet: &str) -> Vec<u8> {
        let workbook = format!(
            r#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">{properties}
<sheets><sheet name="Data" sheetId="1" r:id="rId1"/><sheet name="Other" sheetId="2" r:id="rId2"/></sheets></workbook>"#
        );
        package(&[
            ("xl/workbook.xml", &workbook),
            ("xl/_rels/workbook.xml.rels", RELS),
            ("xl/styles.xml", STYLES),
            ("xl/sharedStrings.xml", SHARED_STRINGS),
            ("xl/worksheets/sheet1.xml", first_sheet),
            ("xl/worksheets/sheet2.xml", "<worksheet><sheetData/></worksheet>"),
        ])
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn reads_first_sheet() {
        let sheet = r#"<worksheet><sheetData>
<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="inlineStr"><is><t>day</t></is></c><c r="C1" t="str"><v>ok</v></c><c r="D1" t="inlineStr"><is><t>at</t></is></c></row>
<row r="2"><c r="A2" t="s"><v>1</v></c><c r="B2" s="1"><v>45306</v></c><c r="C2" t="b"><v>1</v></c><c r="D2" s="3"><v>45306.5</v></c></row>
<row r="3"><c r="A3" t="s"><v>2</v></c><c r="B3" s="1"><v>45307</v></c><c r="C3" t="e"><v>#DIV/0!</v></c><c r="D3" s="3"/></row>
</sheetData></worksheet>"#;
        let table = read_table("book.xlsx", &workbook("", sheet)).unwrap();

        assert_eq!(table.column_names(), vec!["name", "day", "ok", "at"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(
            table.column("name").unwrap().values,
            vec![Value::Text("Ann".into()), Value::Text("Bob & co".into())]
        );
        let day = table.column("day").unwrap();
        assert_eq!(day.kind, ColumnType::Date);
        assert_eq!(day.values, vec![Value::Date(date(2024, 1, 15)), Value::Date(date(2024, 1, 16))]);
        let ok = table.column("ok").unwrap();
        assert_eq!(ok.kind, ColumnType::Boolean);
        assert_eq!(ok.values, vec![Value::Boolean(true), Value::Null]);
        let at = table.column("at").unwrap();
        assert_eq!(at.kind, ColumnType::Timestamp);
        assert_eq!(
            at.values,
            vec![Value::Timestamp(date(2024, 1, 15).and_hms_opt(12, 0, 0).unwrap()), Value::Null]
        );
    }

    #[test]
    fn cells_without_references() {
        let sheet = r#"<worksheet><sheetData>
<row><c t="inlineStr"><is><t>a</t></is></c><c t="inlineStr"><is><t>b</t></is></c></row>
<row><c><v>1</v></c><c><v>2.5</v></c></row>
<row><c><v>3</v></c></row>
</sheetData></worksheet>"#;
        let table = read_table("book.xlsx", &workbook("", sheet)).unwrap();
        assert_eq!(table.column("a").unwrap().values, vec![Value::Int(1), Value::Int(3)]);
        assert_eq!(table.column("b").unwrap().values, vec![Value::Double(2.5), Value::Null]);
    }

    #[test]
    fn uses_1904_date_system() {
        let sheet = r#"<worksheet><sheetData>
<row r="2"><c r="B2" t="inlineStr"><is><t>when</t></is></c></row>
<row r="3"><c r="B3" s="1"><v>1</v></c></row>
</sheetData></worksheet>"#;
        let table = read_table("book.xlsx", &workbook(r#"<workbookPr date1904="1"/>"#, sheet)).unwrap();
        assert_eq!(table.column_names(), vec!["when"]);
        assert_eq!(table.column("when").unwrap().values, vec![Value::Date(date(1904, 1, 2))]);
    }

    #[test]
    fn string_cells_stay_text() {
        let sheet = r#"<worksheet><sheetData>
<row r="1"><c r="A1" t="inlineStr"><is><t>code</t></is></c></row>
<row r="2"><c r="A2" t="inlineStr"><is><t>007</t></is></c></row>
</sheetData></worksheet>"#;
        let table = read_table("book.xlsx", &workbook("", sheet)).unwrap();
        assert_eq!(table.column("code").unwrap().values, vec![Value::Text("007".into())]);
    }

    #[test]
    fn empty_first_sheet_gives_empty_table() {
        let table = read_table("book.xlsx", &workbook("", "<worksheet><sheetData/></worksheet>")).unwrap();
        assert_eq!(table, Table::default());
    }

    #[test]
    fn workbook_without_sheets_is_an_error() {
        let bytes = package(&[
            ("xl/workbook.xml", "<workbook><sheets/></workbook>"),
            ("xl/_rels/workbook.xml.rels", "<Relationships/>"),
        ]);
        let error = read_table("empty.xlsx", &bytes).unwrap_err();
        assert_eq!(error.to_string(), "Workbook 'empty.xlsx' contains no worksheet");
    }

    #[test]
    fn broken_container_is_an_error() {
        assert!(read_table("broken.xlsx", b"not a zip file").is_err());
        let bytes = package(&[("xl/_rels/workbook.xml.rels", RELS)]);
        let error = read_table("partial.xlsx", &bytes).unwrap_err();
        assert_eq!(error.to_string(), "Missing workbook part 'xl/workbook.xml'");
    }
}
