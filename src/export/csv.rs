use crate::error::SweeperError;
use crate::table::Table;
use csv::Terminator;
use csv::WriterBuilder;

/// Writes the table as comma-separated text with a header row and `\n` line endings.
/// A table without columns produces an empty document.
pub(super) fn write_table(table: &Table) -> Result<Vec<u8>, SweeperError> {
    if table.column_count() == 0 {
        return Ok(Vec::new());
    }

    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(table.column_names())?;
    for index in 0..table.row_count() {
        if let Some(row) = table.row(index) {
            writer.write_record(row.iter().map(|value| value.to_string()))?;
        }
    }
    writer.into_inner().map_err(|error| error.into_error().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::FileFormat;
    use crate::table::tests::sample;
    use crate::table::Column;
    use crate::table::ColumnType;
    use crate::table::Value;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn text(table: &Table) -> String {
        String::from_utf8(write_table(table).unwrap()).unwrap()
    }

    #[test]
    fn writes_header_and_rows() {
        assert_eq!(text(&sample()), "id,name,score\n1,ann,1.5\n2,,\n3,cy,2.0\n");
    }

    #[test]
    fn quotes_special_fields() {
        let table = Table::new(
            vec![
                Column::new("a,b", ColumnType::Varchar, vec![Value::Text("say \"hi\"".into())]),
                Column::new("ok", ColumnType::Boolean, vec![Value::Boolean(false)]),
                Column::new(
                    "at",
                    ColumnType::Timestamp,
                    vec![Value::Timestamp(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(3, 4, 5).unwrap())],
                ),
            ],
            1,
        )
        .unwrap();
        assert_eq!(text(&table), "\"a,b\",ok,at\n\"say \"\"hi\"\"\",False,2024-01-02 03:04:05\n");
    }

    #[test]
    fn zero_column_table_is_empty() {
        let mut table = sample();
        table.select_columns::<&str>(&[]).unwrap();
        assert_eq!(text(&table), "");
    }

    #[test]
    fn reads_back_equal_table() {
        let table = sample();
        let bytes = write_table(&table).unwrap();
        assert_eq!(FileFormat::Csv.read_table("sample.csv", &bytes).unwrap(), table);
    }
}
