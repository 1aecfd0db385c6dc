use crate::error::SweeperError;
use crate::export::ExportError;
use crate::spreadsheet::cell::to_serial;
use crate::spreadsheet::reference::index_to_reference;
use crate::table::Table;
use crate::table::Value;
use chrono::NaiveTime;
use chrono::Timelike;
use quick_xml::events::BytesDecl;
use quick_xml::events::BytesEnd;
use quick_xml::events::BytesStart;
use quick_xml::events::BytesText;
use quick_xml::events::Event;
use quick_xml::Writer;
use std::io::Cursor;
use std::io::Write;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;
use zip::ZipWriter;

/// Worksheet size limits
const MAX_ROWS: usize = 1_048_576;
const MAX_COLUMNS: usize = 16_384;

/// Cell style indexes declared in `STYLES`
const STYLE_DATE: &str = "1";
const STYLE_TIME: &str = "2";
const STYLE_TIMESTAMP: &str = "3";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#;

const ROOT_RELATIONSHIPS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#;

const WORKBOOK_RELATIONSHIPS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><numFmts count="3"><numFmt numFmtId="164" formatCode="yyyy-mm-dd"/><numFmt numFmtId="165" formatCode="hh:mm:ss"/><numFmt numFmtId="166" formatCode="yyyy-mm-dd hh:mm:ss"/></numFmts><fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="4"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="164" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/><xf numFmtId="165" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/><xf numFmtId="166" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

/// Writes the table as a workbook with a single worksheet named `Sheet1`.
///
/// The first row holds the column names. Text is written as inline strings,
/// dates and times as 1900-based serial numbers with a matching number format.
/// Missing values produce no cell.
pub(super) fn write_table(table: &Table) -> Result<Vec<u8>, SweeperError> {
    if table.row_count() + 1 > MAX_ROWS {
        Err(ExportError::TooManyRows {
            rows: table.row_count(),
            limit: MAX_ROWS - 1,
        })?
    }
    if table.column_count() > MAX_COLUMNS {
        Err(ExportError::TooManyColumns {
            columns: table.column_count(),
            limit: MAX_COLUMNS,
        })?
    }
    check_dates(table)?;

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (path, content) in [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("_rels/.rels", ROOT_RELATIONSHIPS),
        ("xl/workbook.xml", WORKBOOK),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELATIONSHIPS),
        ("xl/styles.xml", STYLES),
    ] {
        zip.start_file(path, options)?;
        zip.write_all(content.as_bytes())?;
    }

    zip.start_file("xl/worksheets/sheet1.xml", options)?;
    write_worksheet(&mut zip, table)?;
    Ok(zip.finish()?.into_inner())
}

/// Writes the worksheet part.
fn write_worksheet<W: Write>(output: W, table: &Table) -> Result<(), SweeperError> {
    let mut writer = Writer::new(output);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    writer.write_event(Event::Start(
        BytesStart::new("worksheet").with_attributes([("xmlns", "http://schemas.openxmlformats.org/spreadsheetml/2006/main")]),
    ))?;
    writer.write_event(Event::Start(BytesStart::new("sheetData")))?;

    let names = table.column_names();
    write_row(&mut writer, 0, names.iter().map(|name| Some(CellContent::Text(name))))?;
    for index in 0..table.row_count() {
        if let Some(values) = table.row(index) {
            write_row(&mut writer, index + 1, values.into_iter().map(CellContent::from_value))?;
        }
    }

    writer.write_event(Event::End(BytesEnd::new("sheetData")))?;
    writer.write_event(Event::End(BytesEnd::new("worksheet")))?;
    Ok(())
}

/// Content of one written cell.
enum CellContent<'a> {
    Text(&'a str),
    Boolean(bool),
    Number(String),
    Styled(String, &'static str),
}

impl<'a> CellContent<'a> {
    /// Maps a table value to cell content; missing and non-finite values give no cell.
    fn from_value(value: &'a Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Boolean(boolean) => Some(CellContent::Boolean(*boolean)),
            Value::Int(integer) => Some(CellContent::Number(integer.to_string())),
            Value::Double(double) if double.is_finite() => Some(CellContent::Number(value.to_string())),
            Value::Double(_) => None,
            Value::Text(text) => Some(CellContent::Text(text)),
            Value::Date(date) => date
                .and_hms_opt(0, 0, 0)
                .and_then(to_serial)
                .map(|serial| CellContent::Styled(serial.to_string(), STYLE_DATE)),
            Value::Time(time) => Some(CellContent::Styled(time_serial(*time).to_string(), STYLE_TIME)),
            Value::Timestamp(datetime) => {
                to_serial(*datetime).map(|serial| CellContent::Styled(serial.to_string(), STYLE_TIMESTAMP))
            }
        }
    }
}

/// Fails on the first date or timestamp that has no 1900-based serial number.
fn check_dates(table: &Table) -> Result<(), ExportError> {
    for column in table.columns() {
        for (index, value) in column.values.iter().enumerate() {
            let datetime = match value {
                Value::Date(date) => date.and_hms_opt(0, 0, 0),
                Value::Timestamp(datetime) => Some(*datetime),
                _ => continue,
            };
            if datetime.and_then(to_serial).is_none() {
                return Err(ExportError::DateOutOfRange {
                    column: column.name.to_owned(),
                    row: index + 1,
                    value: value.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Fraction of a day elapsed at the given time.
fn time_serial(time: NaiveTime) -> f64 {
    let seconds = time.num_seconds_from_midnight() as f64 + time.nanosecond() as f64 / 1e9;
    seconds / 86_400f64
}

fn write_row<'a, W: Write>(
    writer: &mut Writer<W>,
    row: usize,
    cells: impl Iterator<Item = Option<CellContent<'a>>>,
) -> Result<(), SweeperError> {
    let number = (row + 1).to_string();
    writer.write_event(Event::Start(BytesStart::new("row").with_attributes([("r", number.as_str())])))?;
    for (col, cell) in cells.enumerate() {
        let Some(cell) = cell else { continue };
        let reference = index_to_reference(row, col);
        let mut start = BytesStart::new("c");
        start.push_attribute(("r", reference.as_str()));
        match cell {
            CellContent::Text(text) => {
                start.push_attribute(("t", "inlineStr"));
                writer.write_event(Event::Start(start))?;
                writer.write_event(Event::Start(BytesStart::new("is")))?;
                writer.write_event(Event::Start(BytesStart::new("t").with_attributes([("xml:space", "preserve")])))?;
                writer.write_event(Event::Text(BytesText::new(text)))?;
                writer.write_event(Event::End(BytesEnd::new("t")))?;
                writer.write_event(Event::End(BytesEnd::new("is")))?;
            }
            CellContent::Boolean(boolean) => {
                start.push_attribute(("t", "b"));
                writer.write_event(Event::Start(start))?;
                write_value(writer, if boolean { "1" } else { "0" })?;
            }
            CellContent::Number(number) => {
                writer.write_event(Event::Start(start))?;
                write_value(writer, &number)?;
            }
            CellContent::Styled(number, style) => {
                start.push_attribute(("s", style));
                writer.write_event(Event::Start(start))?;
                write_value(writer, &number)?;
            }
        }
        writer.write_event(Event::End(BytesEnd::new("c")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("row")))?;
    Ok(())
}

fn write_value<W: Write>(writer: &mut Writer<W>, value: &str) -> Result<(), SweeperError> {
    writer.write_event(Event::Start(BytesStart::new("v")))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new("v")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::FileFormat;
    use crate::table::tests::sample;
    use crate::table::Column;
    use crate::table::ColumnType;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use std::io::Read;
    use zip::ZipArchive;

    fn part(bytes: &[u8], name: &str) -> String {
        let mut zip = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut content = String::new();
        zip.by_name(name).unwrap().read_to_string(&mut content).unwrap();
        content
    }

    fn datetime(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, mi, s).unwrap()
    }

    #[test]
    fn writes_package_parts() {
        let bytes = write_table(&sample()).unwrap();
        let sheet = part(&bytes, "xl/worksheets/sheet1.xml");
        assert!(sheet.contains(r#"<c r="A1" t="inlineStr"><is><t xml:space="preserve">id</t></is></c>"#), "{sheet}");
        assert!(sheet.contains(r#"<c r="A2"><v>1</v></c>"#), "{sheet}");
        assert!(sheet.contains(r#"<row r="3"><c r="A3"><v>2</v></c></row>"#), "{sheet}");
        assert!(part(&bytes, "xl/workbook.xml").contains(r#"name="Sheet1""#));
        assert!(part(&bytes, "[Content_Types].xml").contains("/xl/styles.xml"));
    }

    #[test]
    fn escapes_text() {
        let table = Table::new(vec![Column::new("a<b", ColumnType::Varchar, vec![Value::Text("x & y".into())])], 1).unwrap();
        let sheet = part(&write_table(&table).unwrap(), "xl/worksheets/sheet1.xml");
        assert!(sheet.contains("a&lt;b"), "{sheet}");
        assert!(sheet.contains("x &amp; y"), "{sheet}");
    }

    #[test]
    fn reads_back_equal_table() {
        let mut table = sample();
        table.select_columns(&["id", "name"]).unwrap();
        let mut columns = table.columns().to_vec();
        columns.extend([
            Column::new("score", ColumnType::Double, vec![Value::Double(1.5), Value::Null, Value::Double(-2.25)]),
            Column::new("ok", ColumnType::Boolean, vec![Value::Boolean(true), Value::Boolean(false), Value::Null]),
            Column::new(
                "day",
                ColumnType::Date,
                vec![
                    Value::Date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()),
                    Value::Null,
                    Value::Date(NaiveDate::from_ymd_opt(1900, 1, 1).unwrap()),
                ],
            ),
            Column::new(
                "at",
                ColumnType::Timestamp,
                vec![Value::Timestamp(datetime(2024, 1, 15, 12, 30, 15)), Value::Timestamp(datetime(1999, 12, 31, 23, 59, 59)), Value::Null],
            ),
            Column::new(
                "clock",
                ColumnType::Time,
                vec![Value::Time(NaiveTime::from_hms_opt(18, 0, 0).unwrap()), Value::Null, Value::Time(NaiveTime::from_hms_opt(0, 0, 1).unwrap())],
            ),
        ]);
        let table = Table::new(columns, 3).unwrap();

        let bytes = write_table(&table).unwrap();
        assert_eq!(FileFormat::Xlsx.read_table("out.xlsx", &bytes).unwrap(), table);
    }

    #[test]
    fn rejects_dates_before_the_serial_epoch() {
        let table = Table::new(
            vec![Column::new(
                "born",
                ColumnType::Date,
                vec![Value::Date(NaiveDate::from_ymd_opt(1950, 6, 1).unwrap()), Value::Date(NaiveDate::from_ymd_opt(1850, 1, 1).unwrap())],
            )],
            2,
        )
        .unwrap();
        let error = write_table(&table).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Column 'born' row 2: 1850-01-01 is outside the dates a workbook can hold (1899-12-31 to 9999-12-31)"
        );
    }

    #[test]
    fn header_only_table() {
        let table = Table::new(vec![Column::new("name", ColumnType::Varchar, Vec::new())], 0).unwrap();
        let read = FileFormat::Xlsx.read_table("out.xlsx", &write_table(&table).unwrap()).unwrap();
        assert_eq!(read.column_names(), vec!["name"]);
        assert_eq!(read.row_count(), 0);
    }

    #[test]
    fn zero_column_table_gives_empty_sheet() {
        let mut table = sample();
        table.select_columns::<&str>(&[]).unwrap();
        let read = FileFormat::Xlsx.read_table("out.xlsx", &write_table(&table).unwrap()).unwrap();
        assert_eq!(read, Table::default());
    }
}
