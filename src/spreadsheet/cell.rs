use crate::spreadsheet::reference::index_to_reference;
use crate::table::ColumnType;
use crate::table::Value;
use chrono::Duration;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::NaiveTime;
use std::collections::HashMap;
use std::fmt::Display;

/// Types of raw cell data read from an input file.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum CellType {
    #[default]
    Empty,
    /// Boolean values (true/false)
    Boolean,
    /// Numeric values
    Number,
    /// Date/time values stored as numbers from 1900 epoch
    NumberDateTime1900,
    /// Date values stored as numbers from 1900 epoch
    NumberDate1900,
    /// Time values stored as numbers from 1900 epoch
    NumberTime1900,
    /// Date/time values stored as numbers from 1904 epoch
    NumberDateTime1904,
    /// Date values stored as numbers from 1904 epoch
    NumberDate1904,
    /// Time values stored as numbers from 1904 epoch
    NumberTime1904,
    /// ISO 8601 date/time strings
    IsoDateTime,
    /// Inline string values
    InlineString,
    /// Shared string table references
    SharedString,
    /// Error values
    Error,
}

impl CellType {
    /// Parses built-in Excel number format IDs to determine cell type.
    pub(crate) fn parse_builtin_number_format_id(id: &str, is_1904: bool) -> Option<Self> {
        match id {
            "22" => Some(if is_1904 { Self::NumberDateTime1904 } else { Self::NumberDateTime1900 }),
            "14" | "15" | "16" | "17" => Some(if is_1904 { Self::NumberDate1904 } else { Self::NumberDate1900 }),
            "18" | "19" | "20" | "21" | "45" | "46" | "47" => Some(if is_1904 { Self::NumberTime1904 } else { Self::NumberTime1900 }),
            _ => None,
        }
    }

    /// Parses custom number format strings to determine cell type.
    /// Analyzes format codes for date/time patterns, skipping literals, escapes and colors.
    pub(crate) fn parse_custom_number_format(format: &str, is_1904: bool) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_date = false;
        let mut is_time = false;
        let mut is_color = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_color => is_literal = true,

                ']' if is_color => is_color = false,
                '[' if !is_literal => is_color = true,
                _ if is_literal || is_color => (),

                'Y' | 'y' | 'D' | 'd' => is_date = true,
                'H' | 'h' | 'S' | 's' => is_time = true,
                _ => (),
            }
        }

        match (is_date, is_time, is_1904) {
            (true, true, false) => Self::NumberDateTime1900,
            (true, true, true) => Self::NumberDateTime1904,
            (true, false, false) => Self::NumberDate1900,
            (true, false, true) => Self::NumberDate1904,
            (false, true, false) => Self::NumberTime1900,
            (false, true, true) => Self::NumberTime1904,
            (false, false, _) => Self::Number,
        }
    }

    /// Classifies a delimited-text field.
    /// Returns `Empty` for null literals; never yields shared strings or serial dates.
    pub(crate) fn sniff(value: &str) -> Self {
        const NULLS: [&str; 9] = ["", "NA", "N/A", "NaN", "nan", "NULL", "null", "#N/A", "None"];
        let trimmed = value.trim();
        if NULLS.contains(&trimmed) {
            Self::Empty
        } else if trimmed.eq_ignore_ascii_case("true") || trimmed.eq_ignore_ascii_case("false") {
            Self::Boolean
        } else if trimmed.parse::<f64>().is_ok_and(f64::is_finite) {
            Self::Number
        } else if parse_iso_date(trimmed).is_some() || parse_iso_datetime(trimmed).is_some() {
            Self::IsoDateTime
        } else {
            Self::InlineString
        }
    }
}

/// Strings of the shared string table that a sheet actually references.
#[derive(Debug, Default)]
pub(crate) struct SharedStrings {
    /// Loaded strings
    pub(crate) strings: Vec<String>,
    /// Maps shared string ids to positions in `strings`
    pub(crate) mappings: HashMap<usize, usize>,
}

impl SharedStrings {
    /// Looks up a shared string by its id in the workbook's table.
    pub(crate) fn get(&self, id: usize) -> Option<&str> {
        self.mappings
            .get(&id)
            .and_then(|index| self.strings.get(*index))
            .map(String::as_str)
    }
}

/// Represents a single raw cell with position, type, and value.
#[derive(Clone, Debug)]
pub(crate) struct Cell {
    /// Row index (0-based)
    pub(crate) row: usize,
    /// Column index (0-based)
    pub(crate) col: usize,
    /// Cell data type
    pub(crate) kind: CellType,
    /// Cell value as string
    pub(crate) value: String,
}

impl Cell {
    /// Returns the Excel-style cell reference (e.g., "A1", "B2").
    pub(crate) fn reference(&self) -> String {
        index_to_reference(self.row, self.col)
    }

    /// Converts the cell to a typed value of the given column type.
    pub(crate) fn to_value(&self, kind: ColumnType, shared_strings: &SharedStrings) -> Result<Value, String> {
        if matches!(self.kind, CellType::Empty | CellType::Error) {
            return Ok(Value::Null);
        }
        let value = match kind {
            ColumnType::Varchar if self.kind == CellType::SharedString => {
                let id = self.value.trim().parse::<usize>()
                    .map_err(|_| format!("invalid shared string id '{}'", self.value))?;
                let string = shared_strings.get(id).ok_or_else(|| format!("shared string {id} not found"))?;
                Value::Text(string.to_owned())
            }
            ColumnType::Varchar => Value::Text(self.to_string()),
            ColumnType::Boolean => Value::Boolean(self.to_boolean()),
            ColumnType::BigInt => Value::Int(self.to_bigint()?),
            ColumnType::Double => Value::Double(self.to_double()?),
            ColumnType::Timestamp => Value::Timestamp(self.to_datetime()?),
            ColumnType::Date => Value::Date(self.to_date()?),
            ColumnType::Time => Value::Time(self.to_time()?),
        };
        Ok(value)
    }

    /// Converts cell value to boolean ("1" or a case-insensitive "true").
    pub(crate) fn to_boolean(&self) -> bool {
        let value = self.value.trim();
        value == "1" || value.eq_ignore_ascii_case("true")
    }

    /// Converts cell value to 64-bit integer, ignoring an all-zero decimal part.
    pub(crate) fn to_bigint(&self) -> Result<i64, String> {
        let value = self.value.trim();
        let integer = value.split_once('.').map(|(integer, _)| integer).unwrap_or(value);
        integer.parse::<i64>().map_err(|_| format!("parse '{}' to bigint failed", self.value))
    }

    /// Converts cell value to double-precision floating point.
    pub(crate) fn to_double(&self) -> Result<f64, String> {
        self.value.trim().parse::<f64>().map_err(|_| format!("parse '{}' to double failed", self.value))
    }

    /// Converts cell value to a date.
    /// Handles Excel serial dates (1900 and 1904 epochs) and ISO dates.
    pub(crate) fn to_date(&self) -> Result<NaiveDate, String> {
        self.to_datetime().map(|datetime| datetime.date())
    }

    /// Converts cell value to a time of day.
    pub(crate) fn to_time(&self) -> Result<NaiveTime, String> {
        self.to_datetime().map(|datetime| datetime.time())
    }

    /// Converts cell value to a date and time.
    /// Handles Excel serial date/times and ISO date/time strings.
    pub(crate) fn to_datetime(&self) -> Result<NaiveDateTime, String> {
        match self.kind {
            CellType::NumberDateTime1900 | CellType::NumberDate1900 | CellType::NumberTime1900 => {
                from_serial(self.to_double()?, false)
            }
            CellType::NumberDateTime1904 | CellType::NumberDate1904 | CellType::NumberTime1904 => {
                from_serial(self.to_double()?, true)
            }
            CellType::IsoDateTime => {
                let value = self.value.trim();
                parse_iso_datetime(value)
                    .or_else(|| parse_iso_date(value).and_then(|date| date.and_hms_opt(0, 0, 0)))
                    .ok_or_else(|| format!("parse '{}' to datetime failed", self.value))
            }
            _ => Err(format!("parse '{}' to datetime failed", self.value)),
        }
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            CellType::Boolean => match self.value.as_str() {
                "1" => write!(f, "TRUE"),
                "0" => write!(f, "FALSE"),
                value => write!(f, "{value}"),
            },
            CellType::NumberDateTime1900 | CellType::NumberDateTime1904 => match self.to_datetime() {
                Ok(datetime) => write!(f, "{}", Value::Timestamp(datetime)),
                Err(_) => write!(f, "{}", self.value),
            },
            CellType::NumberDate1900 | CellType::NumberDate1904 => match self.to_date() {
                Ok(date) => write!(f, "{}", Value::Date(date)),
                Err(_) => write!(f, "{}", self.value),
            },
            CellType::NumberTime1900 | CellType::NumberTime1904 => match self.to_time() {
                Ok(time) => write!(f, "{}", Value::Time(time)),
                Err(_) => write!(f, "{}", self.value),
            },
            _ => write!(f, "{}", self.value),
        }
    }
}

/// Serial of 10000-01-01, the first moment past the 1900 date system.
const LAST_SERIAL: f64 = 2_958_466.0;

/// Converts an Excel serial number to a date and time.
/// Handles the Lotus 1-2-3 leap year bug for the 1900 epoch.
pub(crate) fn from_serial(serial: f64, is_1904: bool) -> Result<NaiveDateTime, String> {
    if !serial.is_finite() || serial < 0.0 {
        return Err(format!("serial date '{serial}' out of range"));
    }
    let days = serial.trunc() as i64;
    let epoch = if is_1904 {
        NaiveDate::from_ymd_opt(1904, 1, 1)
    } else if days < 60 {
        NaiveDate::from_ymd_opt(1899, 12, 31)
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)
    }
    .and_then(|date| date.and_hms_opt(0, 0, 0))
    .ok_or_else(|| "invalid epoch".to_string())?;
    let milliseconds = (serial.fract() * 86_400_000f64).round() as i64;
    let offset = Duration::try_days(days)
        .zip(Duration::try_milliseconds(milliseconds))
        .map(|(days, milliseconds)| days + milliseconds)
        .ok_or_else(|| format!("serial date '{serial}' out of range"))?;
    epoch
        .checked_add_signed(offset)
        .ok_or_else(|| format!("serial date '{serial}' out of range"))
}

/// Converts a date and time to an Excel serial number in the 1900 date system.
///
/// `None` outside 1899-12-31 to 9999-12-31: earlier moments have no positive
/// serial and later ones are beyond what a workbook can display.
pub(crate) fn to_serial(datetime: NaiveDateTime) -> Option<f64> {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .expect("Hardcode epoch");
    let milliseconds = (datetime - epoch).num_milliseconds() as f64;
    let serial = milliseconds / 86_400_000f64;
    if !(1.0..LAST_SERIAL).contains(&serial) {
        return None;
    }
    // Serials before 1900-03-01 are shifted by the phantom 1900-02-29
    Some(if serial < 61.0 { serial - 1.0 } else { serial })
}

/// Parses an ISO 8601 date (`YYYY-MM-DD`).
pub(crate) fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// Parses an ISO 8601 date and time with a `T` or space separator.
pub(crate) fn parse_iso_datetime(value: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cell(kind: CellType, value: &str) -> Cell {
        Cell {
            row: 0,
            col: 0,
            kind,
            value: value.to_owned(),
        }
    }

    fn datetime(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, mi, s).unwrap()
    }

    #[test]
    fn sniff_fields() {
        assert_eq!(CellType::sniff(""), CellType::Empty);
        assert_eq!(CellType::sniff("NA"), CellType::Empty);
        assert_eq!(CellType::sniff("True"), CellType::Boolean);
        assert_eq!(CellType::sniff(" 12 "), CellType::Number);
        assert_eq!(CellType::sniff("-1.5e3"), CellType::Number);
        assert_eq!(CellType::sniff("inf"), CellType::InlineString);
        assert_eq!(CellType::sniff("2024-02-29"), CellType::IsoDateTime);
        assert_eq!(CellType::sniff("2024-02-29 12:00:00"), CellType::IsoDateTime);
        assert_eq!(CellType::sniff("2024-02-30"), CellType::InlineString);
        assert_eq!(CellType::sniff("hello"), CellType::InlineString);
    }

    #[test]
    fn custom_number_formats() {
        assert_eq!(CellType::parse_custom_number_format("yyyy-mm-dd", false), CellType::NumberDate1900);
        assert_eq!(CellType::parse_custom_number_format("hh:mm:ss", true), CellType::NumberTime1904);
        assert_eq!(CellType::parse_custom_number_format("yyyy-mm-dd hh:mm", false), CellType::NumberDateTime1900);
        assert_eq!(CellType::parse_custom_number_format("[Red]0.00", false), CellType::Number);
        assert_eq!(CellType::parse_custom_number_format("0.0\"days\"", false), CellType::Number);
        assert_eq!(CellType::parse_builtin_number_format_id("14", false), Some(CellType::NumberDate1900));
        assert_eq!(CellType::parse_builtin_number_format_id("2", false), None);
    }

    #[test]
    fn serial_dates() {
        assert_eq!(from_serial(1.0, false).unwrap(), datetime(1900, 1, 1, 0, 0, 0));
        assert_eq!(from_serial(59.0, false).unwrap(), datetime(1900, 2, 28, 0, 0, 0));
        assert_eq!(from_serial(61.0, false).unwrap(), datetime(1900, 3, 1, 0, 0, 0));
        assert_eq!(from_serial(45306.5, false).unwrap(), datetime(2024, 1, 15, 12, 0, 0));
        assert_eq!(from_serial(0.0, true).unwrap(), datetime(1904, 1, 1, 0, 0, 0));
        assert!(from_serial(-1.0, false).is_err());
    }

    #[test]
    fn serial_round_trip() {
        for value in [
            datetime(1899, 12, 31, 12, 0, 0),
            datetime(1900, 1, 1, 0, 0, 0),
            datetime(1900, 2, 28, 0, 0, 0),
            datetime(1900, 3, 1, 6, 0, 0),
            datetime(2024, 1, 15, 12, 0, 0),
            datetime(9999, 12, 31, 23, 59, 59),
        ] {
            assert_eq!(from_serial(to_serial(value).unwrap(), false).unwrap(), value);
        }
    }

    #[test]
    fn serials_cover_workbook_dates_only() {
        assert_eq!(to_serial(datetime(1899, 12, 31, 0, 0, 0)), Some(0.0));
        assert_eq!(to_serial(datetime(1899, 12, 30, 23, 59, 59)), None);
        assert_eq!(to_serial(datetime(1850, 1, 1, 0, 0, 0)), None);
        assert_eq!(to_serial(datetime(10000, 1, 1, 0, 0, 0)), None);
    }

    #[test]
    fn converts_to_values() {
        let strings = SharedStrings {
            strings: vec!["hello".to_string()],
            mappings: HashMap::from([(7, 0)]),
        };
        assert_eq!(cell(CellType::Number, "3.0").to_value(ColumnType::BigInt, &strings), Ok(Value::Int(3)));
        assert_eq!(cell(CellType::Number, "3").to_value(ColumnType::Double, &strings), Ok(Value::Double(3.0)));
        assert_eq!(cell(CellType::Boolean, "1").to_value(ColumnType::Boolean, &strings), Ok(Value::Boolean(true)));
        assert_eq!(cell(CellType::Boolean, "FALSE").to_value(ColumnType::Boolean, &strings), Ok(Value::Boolean(false)));
        assert_eq!(cell(CellType::SharedString, "7").to_value(ColumnType::Varchar, &strings), Ok(Value::Text("hello".to_string())));
        assert!(cell(CellType::SharedString, "8").to_value(ColumnType::Varchar, &strings).is_err());
        assert_eq!(cell(CellType::Error, "#N/A").to_value(ColumnType::Double, &strings), Ok(Value::Null));
        assert_eq!(
            cell(CellType::IsoDateTime, "2024-01-02").to_value(ColumnType::Timestamp, &strings),
            Ok(Value::Timestamp(datetime(2024, 1, 2, 0, 0, 0)))
        );
        assert_eq!(
            cell(CellType::NumberTime1900, "0.75").to_value(ColumnType::Time, &strings),
            Ok(Value::Time(NaiveTime::from_hms_opt(18, 0, 0).unwrap()))
        );
    }

    #[test]
    fn mixed_cells_display_as_text() {
        assert_eq!(cell(CellType::Number, "2.50").to_string(), "2.50");
        assert_eq!(cell(CellType::Boolean, "1").to_string(), "TRUE");
        assert_eq!(cell(CellType::NumberDate1900, "45306").to_string(), "2024-01-15");
        assert_eq!(cell(CellType::IsoDateTime, "2024-01-02T03:04:05").to_string(), "2024-01-02T03:04:05");
    }
}
