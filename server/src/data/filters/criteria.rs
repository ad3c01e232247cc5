//! Dynamically decoded criteria
//!
//! [`QueryCriteria`] holds the filters decoded from a request against a
//! [`CriteriaSchema`](super::schema::CriteriaSchema), keyed by attribute name.

use std::collections::BTreeMap;
use std::fmt;

use super::builder::{Criteria, FieldFilter};
use super::predicate::Predicate;
use super::types::{
    BooleanFilter, DoubleFilter, InstantFilter, IntegerFilter, LocalDateFilter, LongFilter,
    StringFilter, ToPredicate, UuidFilter, ZonedDateTimeFilter,
};

/// A filter of any supported kind
#[derive(Debug, Clone, PartialEq)]
pub enum AnyFilter {
    Integer(IntegerFilter),
    Long(LongFilter),
    Double(DoubleFilter),
    Text(StringFilter),
    Boolean(BooleanFilter),
    Uuid(UuidFilter),
    LocalDate(LocalDateFilter),
    ZonedDateTime(ZonedDateTimeFilter),
    Instant(InstantFilter),
}

impl AnyFilter {
    fn inner(&self) -> &dyn ToPredicate {
        match self {
            Self::Integer(f) => f,
            Self::Long(f) => f,
            Self::Double(f) => f,
            Self::Text(f) => f,
            Self::Boolean(f) => f,
            Self::Uuid(f) => f,
            Self::LocalDate(f) => f,
            Self::ZonedDateTime(f) => f,
            Self::Instant(f) => f,
        }
    }
}

impl ToPredicate for AnyFilter {
    fn to_predicate(&self, column: &str) -> Predicate {
        self.inner().to_predicate(column)
    }

    fn is_empty(&self) -> bool {
        self.inner().is_empty()
    }
}

impl fmt::Display for AnyFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(inner) => write!(f, "{}", inner),
            Self::Long(inner) => write!(f, "{}", inner),
            Self::Double(inner) => write!(f, "{}", inner),
            Self::Text(inner) => write!(f, "{}", inner),
            Self::Boolean(inner) => write!(f, "{}", inner),
            Self::Uuid(inner) => write!(f, "{}", inner),
            Self::LocalDate(inner) => write!(f, "{}", inner),
            Self::ZonedDateTime(inner) => write!(f, "{}", inner),
            Self::Instant(inner) => write!(f, "{}", inner),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CriteriaEntry {
    pub column: String,
    pub filter: AnyFilter,
}

/// Filters decoded from one request, ordered by attribute name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryCriteria {
    entries: BTreeMap<String, CriteriaEntry>,
}

impl QueryCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, attribute: &str, column: &str, filter: AnyFilter) {
        self.entries.insert(
            attribute.to_string(),
            CriteriaEntry {
                column: column.to_string(),
                filter,
            },
        );
    }

    pub fn get(&self, attribute: &str) -> Option<&AnyFilter> {
        self.entries.get(attribute).map(|e| &e.filter)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Criteria for QueryCriteria {
    fn filters(&self) -> Vec<FieldFilter<'_>> {
        self.entries
            .iter()
            .map(|(attribute, entry)| {
                FieldFilter::new(attribute, &entry.column, &entry.filter as &dyn ToPredicate)
            })
            .collect()
    }
}

impl fmt::Display for QueryCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .entries
            .iter()
            .map(|(attribute, entry)| format!("{}={}", attribute, entry.filter))
            .collect();
        write!(f, "Criteria {{{}}}", parts.join(", "))
    }
}
