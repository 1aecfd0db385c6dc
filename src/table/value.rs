use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::NaiveTime;
use std::fmt::Display;
use std::hash::Hash;
use std::hash::Hasher;

/// A single typed table value.
///
/// Doubles are always finite: the readers never produce NaN or infinities,
/// which is what makes the `Eq` and `Hash` implementations sound.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// Missing value
    #[default]
    Null,
    Boolean(bool),
    Int(i64),
    Double(f64),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Returns true if the value is missing.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the value as a double if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(value) => Some(*value as f64),
            Value::Double(value) => Some(*value),
            _ => None,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => (),
            Value::Boolean(value) => value.hash(state),
            Value::Int(value) => value.hash(state),
            // 0.0 and -0.0 compare equal, so they must hash equally
            Value::Double(value) => (if *value == 0.0 { 0 } else { value.to_bits() }).hash(state),
            Value::Text(value) => value.hash(state),
            Value::Date(value) => value.hash(state),
            Value::Time(value) => value.hash(state),
            Value::Timestamp(value) => value.hash(state),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Boolean(true) => write!(f, "True"),
            Value::Boolean(false) => write!(f, "False"),
            Value::Int(value) => write!(f, "{value}"),
            // Whole doubles keep one decimal so they read back as doubles
            Value::Double(value) if value.fract() == 0.0 && value.abs() < 1e16 => write!(f, "{value:.1}"),
            Value::Double(value) => write!(f, "{value}"),
            Value::Text(value) => write!(f, "{value}"),
            Value::Date(value) => write!(f, "{}", value.format("%Y-%m-%d")),
            Value::Time(value) => write!(f, "{}", value.format("%H:%M:%S%.f")),
            Value::Timestamp(value) => write!(f, "{}", value.format("%Y-%m-%d %H:%M:%S%.f")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    #[test]
    fn display_matches_export_format() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let time = NaiveTime::from_hms_milli_opt(7, 5, 3, 250).unwrap();
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Boolean(true).to_string(), "True");
        assert_eq!(Value::Int(-4).to_string(), "-4");
        assert_eq!(Value::Double(2.0).to_string(), "2.0");
        assert_eq!(Value::Double(2.25).to_string(), "2.25");
        assert_eq!(Value::Date(date).to_string(), "2024-03-09");
        assert_eq!(Value::Time(time).to_string(), "07:05:03.250");
        assert_eq!(Value::Timestamp(date.and_hms_opt(1, 2, 3).unwrap()).to_string(), "2024-03-09 01:02:03");
    }

    #[test]
    fn signed_zero_hashes_equal() {
        let set: HashSet<Value> = [Value::Double(0.0), Value::Double(-0.0)].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn numeric_view() {
        assert_eq!(Value::Int(3).as_f64(), Some(3.0));
        assert_eq!(Value::Text("3".to_string()).as_f64(), None);
        assert!(Value::Null.is_null());
    }
}
