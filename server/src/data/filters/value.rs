//! Filter value model
//!
//! Every filterable Rust type is normalized into a [`Value`] before it reaches
//! a predicate. Comparisons between values follow SQL semantics: values of
//! unrelated types are incomparable and never match.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat, SubsecRound, Utc};
use uuid::Uuid;

/// A normalized attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Double(f64),
    Text(String),
    Boolean(bool),
    /// Instants are compared in UTC regardless of the offset they were written with
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
    Uuid(Uuid),
}

impl Value {
    /// Compare two values. Integers and doubles compare numerically with each
    /// other; every other pairing of distinct variants is incomparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::Integer(a), Self::Double(b)) => (*a as f64).partial_cmp(b),
            (Self::Double(a), Self::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Self::Double(a), Self::Double(b)) => a.partial_cmp(b),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Boolean(a), Self::Boolean(b)) => Some(a.cmp(b)),
            (Self::Timestamp(a), Self::Timestamp(b)) => Some(a.cmp(b)),
            (Self::Date(a), Self::Date(b)) => Some(a.cmp(b)),
            (Self::Uuid(a), Self::Uuid(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Value equality under [`Value::compare`]
    pub fn same_as(&self, other: &Value) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Integer(_) => "integer",
            Self::Double(_) => "double",
            Self::Text(_) => "text",
            Self::Boolean(_) => "boolean",
            Self::Timestamp(_) => "timestamp",
            Self::Date(_) => "date",
            Self::Uuid(_) => "uuid",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{}", v),
            Self::Text(v) => write!(f, "{}", v),
            Self::Boolean(v) => write!(f, "{}", v),
            Self::Timestamp(v) => write!(f, "{}", v.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Self::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            Self::Uuid(v) => write!(f, "{}", v.hyphenated()),
        }
    }
}

/// A Rust type that can be carried by a filter
pub trait FilterValue: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    fn to_value(&self) -> Value;
}

/// A filter value with a total order, usable as a range bound
///
/// Only types implementing this trait can appear in a `RangeFilter`, so a range
/// constraint over a non-orderable type is rejected at compile time.
pub trait OrderedValue: FilterValue + PartialOrd {}

impl FilterValue for i32 {
    fn to_value(&self) -> Value {
        Value::Integer(i64::from(*self))
    }
}

impl FilterValue for i64 {
    fn to_value(&self) -> Value {
        Value::Integer(*self)
    }
}

impl FilterValue for f64 {
    fn to_value(&self) -> Value {
        Value::Double(*self)
    }
}

impl FilterValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl FilterValue for bool {
    fn to_value(&self) -> Value {
        Value::Boolean(*self)
    }
}

/// Instants are held at microsecond precision, the resolution they are stored at
impl FilterValue for DateTime<FixedOffset> {
    fn to_value(&self) -> Value {
        Value::Timestamp(self.with_timezone(&Utc).trunc_subsecs(6))
    }
}

impl FilterValue for DateTime<Utc> {
    fn to_value(&self) -> Value {
        Value::Timestamp(self.trunc_subsecs(6))
    }
}

impl FilterValue for NaiveDate {
    fn to_value(&self) -> Value {
        Value::Date(*self)
    }
}

impl FilterValue for Uuid {
    fn to_value(&self) -> Value {
        Value::Uuid(*self)
    }
}

impl OrderedValue for i32 {}
impl OrderedValue for i64 {}
impl OrderedValue for f64 {}
impl OrderedValue for DateTime<FixedOffset> {}
impl OrderedValue for DateTime<Utc> {}
impl OrderedValue for NaiveDate {}

/// Something a predicate can be evaluated against
///
/// `None` means the attribute is absent or null.
pub trait Record {
    fn get(&self, column: &str) -> Option<Value>;
}

impl Record for BTreeMap<String, Value> {
    fn get(&self, column: &str) -> Option<Value> {
        BTreeMap::get(self, column).cloned()
    }
}

impl Record for HashMap<String, Value> {
    fn get(&self, column: &str) -> Option<Value> {
        HashMap::get(self, column).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn timestamps_truncate_to_microseconds() {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let value = (base + Duration::nanoseconds(1_500)).to_value();
        assert_eq!(value, Value::Timestamp(base + Duration::microseconds(1)));

        let zoned = (base + Duration::nanoseconds(500)).fixed_offset();
        assert_eq!(zoned.to_value(), Value::Timestamp(base));
    }

    #[test]
    fn integer_and_double_compare_numerically() {
        assert_eq!(
            Value::Integer(10).compare(&Value::Double(10.0)),
            Some(Ordering::Equal)
        );
        assert_eq!(
            Value::Double(9.5).compare(&Value::Integer(10)),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn mismatched_types_are_incomparable() {
        assert_eq!(Value::Integer(1).compare(&Value::Text("1".into())), None);
        assert!(!Value::Boolean(true).same_as(&Value::Integer(1)));
    }

    #[test]
    fn nan_is_incomparable() {
        assert_eq!(Value::Double(f64::NAN).compare(&Value::Double(1.0)), None);
    }

    #[test]
    fn zoned_datetimes_normalize_to_utc() {
        let paris = FixedOffset::east_opt(3600).unwrap();
        let local = paris.with_ymd_and_hms(2024, 3, 1, 13, 0, 0).unwrap();
        let utc = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        assert!(local.to_value().same_as(&utc.to_value()));
    }

    #[test]
    fn display_uses_canonical_encodings() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(Value::Timestamp(ts).to_string(), "2024-01-02T03:04:05Z");

        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(Value::Date(date).to_string(), "2024-02-29");
    }

    #[test]
    fn map_records_return_none_for_missing_columns() {
        let mut record = BTreeMap::new();
        record.insert("age".to_string(), Value::Integer(30));

        assert_eq!(Record::get(&record, "age"), Some(Value::Integer(30)));
        assert_eq!(Record::get(&record, "name"), None);
    }
}
