//! Cleaning operations applied to a table in place.
use crate::table::ColumnType;
use crate::table::Table;
use crate::table::Value;
use std::collections::HashSet;

impl Table {
    /// Removes rows that are exact duplicates of an earlier row across all columns.
    /// The first occurrence is kept and the order of the remaining rows is preserved.
    /// Missing values compare equal to each other.
    ///
    /// # Returns
    /// Number of removed rows
    pub fn remove_duplicates(&mut self) -> usize {
        let rows = self.row_count();
        let keep: Vec<bool> = {
            let mut seen = HashSet::<Vec<&Value>>::with_capacity(rows);
            (0..rows)
                .map(|index| seen.insert(self.row(index).unwrap_or_default()))
                .collect()
        };
        let removed = keep.iter().filter(|flag| !**flag).count();
        if removed > 0 {
            self.retain_rows(&keep);
        }
        removed
    }

    /// Replaces missing values of every numeric column with the mean of its present values.
    ///
    /// Non-numeric columns and columns without any present value are left untouched.
    /// An integer column whose mean has a fractional part is widened to double.
    ///
    /// # Returns
    /// Number of filled cells
    pub fn fill_missing_numeric(&mut self) -> usize {
        let mut filled = 0usize;
        for column in self.columns_mut().iter_mut().filter(|column| column.kind.is_numeric()) {
            let present: Vec<f64> = column.values.iter().filter_map(Value::as_f64).collect();
            let missing = column.values.len() - present.len();
            if present.is_empty() || missing == 0 {
                continue;
            }
            let mean = present.iter().sum::<f64>() / present.len() as f64;
            let fill = if column.kind.is_int() && mean.fract() == 0.0 {
                Value::Int(mean as i64)
            } else {
                if column.kind.is_int() {
                    column.kind = ColumnType::Double;
                    for value in column.values.iter_mut() {
                        if let Value::Int(integer) = value {
                            *value = Value::Double(*integer as f64);
                        }
                    }
                }
                Value::Double(mean)
            };
            for value in column.values.iter_mut().filter(|value| value.is_null()) {
                *value = fill.clone();
            }
            filled += missing;
        }
        filled
    }
}
