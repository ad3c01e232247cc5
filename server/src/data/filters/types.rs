//! Filter type definitions
//!
//! [`Filter`] carries equality, presence and membership constraints for one
//! attribute. [`RangeFilter`] adds ordering bounds and only exists for
//! [`OrderedValue`] types. [`StringFilter`] adds substring matching.
//!
//! Filters are plain values: every field is optional, unset means "no
//! constraint", and no cross-field validation happens. An unsatisfiable
//! combination (for example a lower bound above the upper bound) is legal and
//! simply matches nothing.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::predicate::{CompareOp, Predicate};
use super::value::{FilterValue, OrderedValue, Value};

/// Converts a filter into predicate fragments for one column
pub trait ToPredicate {
    /// AND of one fragment per set field, or `Predicate::All` if nothing is set
    fn to_predicate(&self, column: &str) -> Predicate;

    /// True when no field is set
    fn is_empty(&self) -> bool;
}

/// Equality, presence and membership constraints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equals: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_equals: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specified: Option<bool>,
    #[serde(default, rename = "in", skip_serializing_if = "Option::is_none")]
    pub in_values: Option<Vec<T>>,
    #[serde(default, rename = "notIn", skip_serializing_if = "Option::is_none")]
    pub not_in_values: Option<Vec<T>>,
}

impl<T> Default for Filter<T> {
    fn default() -> Self {
        Self {
            equals: None,
            not_equals: None,
            specified: None,
            in_values: None,
            not_in_values: None,
        }
    }
}

/// Fluent `with_*` combinators shared by every filter carrying a [`Filter`]
///
/// Each combinator consumes the filter, sets exactly one field, and returns it.
pub trait FilterFields<T: FilterValue>: Sized {
    fn base(&self) -> &Filter<T>;
    fn base_mut(&mut self) -> &mut Filter<T>;

    fn with_equals(mut self, value: T) -> Self {
        self.base_mut().equals = Some(value);
        self
    }

    fn with_not_equals(mut self, value: T) -> Self {
        self.base_mut().not_equals = Some(value);
        self
    }

    fn with_specified(mut self, specified: bool) -> Self {
        self.base_mut().specified = Some(specified);
        self
    }

    fn with_in<I: IntoIterator<Item = T>>(mut self, values: I) -> Self {
        self.base_mut().in_values = Some(values.into_iter().collect());
        self
    }

    fn with_not_in<I: IntoIterator<Item = T>>(mut self, values: I) -> Self {
        self.base_mut().not_in_values = Some(values.into_iter().collect());
        self
    }
}

impl<T: FilterValue> FilterFields<T> for Filter<T> {
    fn base(&self) -> &Filter<T> {
        self
    }

    fn base_mut(&mut self) -> &mut Filter<T> {
        self
    }
}

impl<T: FilterValue> Filter<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_unset(&self) -> bool {
        self.equals.is_none()
            && self.not_equals.is_none()
            && self.specified.is_none()
            && self.in_values.is_none()
            && self.not_in_values.is_none()
    }

    fn push_fragments(&self, column: &str, out: &mut Vec<Predicate>) {
        if let Some(value) = &self.equals {
            out.push(Predicate::compare(column, CompareOp::Eq, value.to_value()));
        }
        if let Some(value) = &self.not_equals {
            out.push(Predicate::compare(column, CompareOp::Ne, value.to_value()));
        }
        if let Some(present) = self.specified {
            out.push(Predicate::Presence {
                column: column.to_string(),
                present,
            });
        }
        if let Some(values) = &self.in_values {
            out.push(membership(column, values, false));
        }
        if let Some(values) = &self.not_in_values {
            out.push(membership(column, values, true));
        }
    }

    fn push_display_fields(&self, fields: &mut Vec<String>) {
        if let Some(v) = &self.equals {
            fields.push(format!("equals={}", v.to_value()));
        }
        if let Some(v) = &self.not_equals {
            fields.push(format!("notEquals={}", v.to_value()));
        }
        if let Some(v) = self.specified {
            fields.push(format!("specified={}", v));
        }
        if let Some(values) = &self.in_values {
            fields.push(format!("in={}", display_list(values)));
        }
        if let Some(values) = &self.not_in_values {
            fields.push(format!("notIn={}", display_list(values)));
        }
    }
}

impl<T: FilterValue> ToPredicate for Filter<T> {
    fn to_predicate(&self, column: &str) -> Predicate {
        let mut fragments = Vec::new();
        self.push_fragments(column, &mut fragments);
        Predicate::all_of(fragments)
    }

    fn is_empty(&self) -> bool {
        self.is_unset()
    }
}

/// Membership lists compare as sets: order and duplicates are irrelevant
impl<T: FilterValue> PartialEq for Filter<T> {
    fn eq(&self, other: &Self) -> bool {
        self.equals == other.equals
            && self.not_equals == other.not_equals
            && self.specified == other.specified
            && same_members(&self.in_values, &other.in_values)
            && same_members(&self.not_in_values, &other.not_in_values)
    }
}

impl<T: FilterValue> fmt::Display for Filter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields = Vec::new();
        self.push_display_fields(&mut fields);
        write!(f, "Filter [{}]", fields.join(", "))
    }
}

/// [`Filter`] plus strict and inclusive bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeFilter<T> {
    #[serde(flatten)]
    pub base: Filter<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub greater_than: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub greater_than_or_equal: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub less_than: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub less_than_or_equal: Option<T>,
}

impl<T> Default for RangeFilter<T> {
    fn default() -> Self {
        Self {
            base: Filter::default(),
            greater_than: None,
            greater_than_or_equal: None,
            less_than: None,
            less_than_or_equal: None,
        }
    }
}

impl<T: OrderedValue> FilterFields<T> for RangeFilter<T> {
    fn base(&self) -> &Filter<T> {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Filter<T> {
        &mut self.base
    }
}

impl<T: OrderedValue> RangeFilter<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_greater_than(mut self, value: T) -> Self {
        self.greater_than = Some(value);
        self
    }

    pub fn with_greater_than_or_equal(mut self, value: T) -> Self {
        self.greater_than_or_equal = Some(value);
        self
    }

    pub fn with_less_than(mut self, value: T) -> Self {
        self.less_than = Some(value);
        self
    }

    pub fn with_less_than_or_equal(mut self, value: T) -> Self {
        self.less_than_or_equal = Some(value);
        self
    }
}

impl<T: OrderedValue> ToPredicate for RangeFilter<T> {
    fn to_predicate(&self, column: &str) -> Predicate {
        let mut fragments = Vec::new();
        self.base.push_fragments(column, &mut fragments);

        let bounds = [
            (&self.greater_than, CompareOp::Gt),
            (&self.greater_than_or_equal, CompareOp::Gte),
            (&self.less_than, CompareOp::Lt),
            (&self.less_than_or_equal, CompareOp::Lte),
        ];
        for (bound, op) in bounds {
            if let Some(value) = bound {
                fragments.push(Predicate::compare(column, op, value.to_value()));
            }
        }

        Predicate::all_of(fragments)
    }

    fn is_empty(&self) -> bool {
        self.base.is_unset()
            && self.greater_than.is_none()
            && self.greater_than_or_equal.is_none()
            && self.less_than.is_none()
            && self.less_than_or_equal.is_none()
    }
}

impl<T: OrderedValue> PartialEq for RangeFilter<T> {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base
            && self.greater_than == other.greater_than
            && self.greater_than_or_equal == other.greater_than_or_equal
            && self.less_than == other.less_than
            && self.less_than_or_equal == other.less_than_or_equal
    }
}

impl<T: OrderedValue> fmt::Display for RangeFilter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields = Vec::new();
        self.base.push_display_fields(&mut fields);
        let bounds = [
            ("greaterThan", &self.greater_than),
            ("greaterThanOrEqual", &self.greater_than_or_equal),
            ("lessThan", &self.less_than),
            ("lessThanOrEqual", &self.less_than_or_equal),
        ];
        for (name, bound) in bounds {
            if let Some(value) = bound {
                fields.push(format!("{}={}", name, value.to_value()));
            }
        }
        write!(f, "RangeFilter [{}]", fields.join(", "))
    }
}

/// [`Filter`] over text plus case-insensitive substring constraints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StringFilter {
    #[serde(flatten)]
    pub base: Filter<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub does_not_contain: Option<String>,
}

impl FilterFields<String> for StringFilter {
    fn base(&self) -> &Filter<String> {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Filter<String> {
        &mut self.base
    }
}

impl StringFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contains(mut self, needle: impl Into<String>) -> Self {
        self.contains = Some(needle.into());
        self
    }

    pub fn with_does_not_contain(mut self, needle: impl Into<String>) -> Self {
        self.does_not_contain = Some(needle.into());
        self
    }
}

impl ToPredicate for StringFilter {
    fn to_predicate(&self, column: &str) -> Predicate {
        let mut fragments = Vec::new();
        self.base.push_fragments(column, &mut fragments);
        if let Some(needle) = &self.contains {
            fragments.push(Predicate::Contains {
                column: column.to_string(),
                needle: needle.clone(),
                negated: false,
            });
        }
        if let Some(needle) = &self.does_not_contain {
            fragments.push(Predicate::Contains {
                column: column.to_string(),
                needle: needle.clone(),
                negated: true,
            });
        }
        Predicate::all_of(fragments)
    }

    fn is_empty(&self) -> bool {
        self.base.is_unset() && self.contains.is_none() && self.does_not_contain.is_none()
    }
}

impl fmt::Display for StringFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields = Vec::new();
        self.base.push_display_fields(&mut fields);
        if let Some(v) = &self.contains {
            fields.push(format!("contains={}", v));
        }
        if let Some(v) = &self.does_not_contain {
            fields.push(format!("doesNotContain={}", v));
        }
        write!(f, "StringFilter [{}]", fields.join(", "))
    }
}

pub type IntegerFilter = RangeFilter<i32>;
pub type LongFilter = RangeFilter<i64>;
pub type DoubleFilter = RangeFilter<f64>;
pub type BooleanFilter = Filter<bool>;
pub type UuidFilter = Filter<Uuid>;
pub type LocalDateFilter = RangeFilter<NaiveDate>;
pub type InstantFilter = RangeFilter<DateTime<Utc>>;
/// Zone-qualified date-times, compared as instants
pub type ZonedDateTimeFilter = RangeFilter<DateTime<FixedOffset>>;

fn membership<T: FilterValue>(column: &str, values: &[T], negated: bool) -> Predicate {
    let mut normalized: Vec<Value> = Vec::with_capacity(values.len());
    for value in values.iter().map(FilterValue::to_value) {
        if !normalized.iter().any(|seen| seen.same_as(&value)) {
            normalized.push(value);
        }
    }
    Predicate::In {
        column: column.to_string(),
        values: normalized,
        negated,
    }
}

fn same_members<T: PartialEq>(a: &Option<Vec<T>>, b: &Option<Vec<T>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.iter().all(|x| b.contains(x)) && b.iter().all(|x| a.contains(x)),
        _ => false,
    }
}

fn display_list<T: FilterValue>(values: &[T]) -> String {
    let items: Vec<String> = values.iter().map(|v| v.to_value().to_string()).collect();
    format!("[{}]", items.join(", "))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::TimeZone;

    use super::*;

    fn records(values: &[i64]) -> Vec<BTreeMap<String, Value>> {
        values
            .iter()
            .map(|v| {
                let mut r = BTreeMap::new();
                r.insert("n".to_string(), Value::Integer(*v));
                r
            })
            .collect()
    }

    fn select(filter: &dyn ToPredicate, data: &[BTreeMap<String, Value>]) -> Vec<i64> {
        let predicate = filter.to_predicate("n");
        data.iter()
            .filter(|r| predicate.matches(*r))
            .filter_map(|r| match r.get("n") {
                Some(Value::Integer(v)) => Some(*v),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn empty_filter_contributes_nothing() {
        let filter = LongFilter::new();
        assert!(filter.is_empty());
        assert_eq!(filter.to_predicate("n"), Predicate::All);
    }

    #[test]
    fn half_open_range_selects_expected_records() {
        let data = records(&[5, 10, 15, 20]);
        let filter = LongFilter::new()
            .with_greater_than_or_equal(10)
            .with_less_than(20);

        assert_eq!(select(&filter, &data), vec![10, 15]);
    }

    #[test]
    fn strict_lower_bound_excludes_the_bound() {
        let data = records(&[9, 10, 11]);
        assert_eq!(
            select(&LongFilter::new().with_greater_than(10), &data),
            vec![11]
        );
        assert_eq!(
            select(&LongFilter::new().with_greater_than_or_equal(10), &data),
            vec![10, 11]
        );
    }

    #[test]
    fn inverted_bounds_match_nothing() {
        let data = records(&[1, 5, 10, 15, 20, 25]);
        let filter = LongFilter::new()
            .with_greater_than_or_equal(20)
            .with_less_than_or_equal(10);

        assert!(!filter.is_empty());
        assert!(select(&filter, &data).is_empty());
    }

    #[test]
    fn equals_combined_with_disjoint_range_matches_nothing() {
        let data = records(&[5, 10, 15]);
        let filter = LongFilter::new().with_equals(5).with_greater_than(10);
        assert!(select(&filter, &data).is_empty());
    }

    #[test]
    fn in_equals_union_of_equals() {
        let data = records(&[1, 2, 3, 4, 5, 6]);
        let members = [2_i64, 4, 6];

        let via_in = select(&LongFilter::new().with_in(members), &data);
        let mut via_equals: Vec<i64> = members
            .iter()
            .flat_map(|m| select(&LongFilter::new().with_equals(*m), &data))
            .collect();
        via_equals.sort();

        assert_eq!(via_in, via_equals);
    }

    #[test]
    fn in_list_duplicates_are_collapsed() {
        let filter = LongFilter::new().with_in([3, 3, 1]);
        match filter.to_predicate("n") {
            Predicate::In { values, .. } => {
                assert_eq!(values, vec![Value::Integer(3), Value::Integer(1)])
            }
            other => panic!("unexpected predicate {:?}", other),
        }
    }

    #[test]
    fn equality_treats_membership_as_sets() {
        let a = LongFilter::new().with_in([1, 2, 3]);
        let b = LongFilter::new().with_in([3, 1, 2, 2]);
        let c = LongFilter::new().with_in([1, 2]);

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn specified_false_selects_nulls() {
        let mut data = records(&[1, 2]);
        data.push(BTreeMap::new());

        let filter = LongFilter::new().with_specified(false);
        let predicate = filter.to_predicate("n");
        let matched: Vec<_> = data.iter().filter(|r| predicate.matches(*r)).collect();

        assert_eq!(matched.len(), 1);
        assert!(matched[0].is_empty());
    }

    #[test]
    fn zoned_filter_compares_instants_across_offsets() {
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let bound = plus_two.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let filter = ZonedDateTimeFilter::new().with_greater_than_or_equal(bound);

        let mut record = BTreeMap::new();
        let utc_equal = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
        record.insert("n".to_string(), Value::Timestamp(utc_equal));

        assert!(filter.to_predicate("n").matches(&record));
    }

    #[test]
    fn boolean_filter_supports_equality_and_membership() {
        let filter = BooleanFilter::new().with_not_equals(false);
        let mut record = BTreeMap::new();
        record.insert("n".to_string(), Value::Boolean(true));
        assert!(filter.to_predicate("n").matches(&record));

        let filter = BooleanFilter::new().with_in([false]);
        assert!(!filter.to_predicate("n").matches(&record));
    }

    #[test]
    fn string_filter_combines_contains_and_equality() {
        let filter = StringFilter::new()
            .with_contains("adm")
            .with_not_equals("admin".to_string());
        let predicate = filter.to_predicate("login");

        let mut sysadmin = BTreeMap::new();
        sysadmin.insert("login".to_string(), Value::Text("sysadmin".into()));
        let mut admin = BTreeMap::new();
        admin.insert("login".to_string(), Value::Text("admin".into()));

        assert!(predicate.matches(&sysadmin));
        assert!(!predicate.matches(&admin));
    }

    #[test]
    fn display_lists_set_fields() {
        let filter = LongFilter::new()
            .with_in([1, 2])
            .with_greater_than(0)
            .with_specified(true);
        assert_eq!(
            filter.to_string(),
            "RangeFilter [specified=true, in=[1, 2], greaterThan=0]"
        );
        assert_eq!(BooleanFilter::new().to_string(), "Filter []");
        assert_eq!(
            StringFilter::new().with_contains("x").to_string(),
            "StringFilter [contains=x]"
        );
    }

    #[test]
    fn deserializes_camel_case_json() {
        let json = r#"{
            "equals": "2024-01-01T10:00:00+02:00",
            "greaterThan": "2023-01-01T00:00:00Z",
            "in": ["2024-01-01T08:00:00Z"]
        }"#;
        let filter: ZonedDateTimeFilter = serde_json::from_str(json).unwrap();

        assert!(filter.base.equals.is_some());
        assert!(filter.greater_than.is_some());
        assert_eq!(filter.base.in_values.as_ref().map(Vec::len), Some(1));
        assert!(filter.less_than.is_none());
    }

    #[test]
    fn rejects_malformed_datetime_in_json() {
        let json = r#"{ "equals": "yesterday" }"#;
        assert!(serde_json::from_str::<ZonedDateTimeFilter>(json).is_err());
    }

    #[test]
    fn serializes_only_set_fields() {
        let filter = IntegerFilter::new().with_equals(3).with_less_than(9);
        let json = serde_json::to_value(&filter).unwrap();
        assert_eq!(json, serde_json::json!({ "equals": 3, "lessThan": 9 }));
    }
}
