//! Predicate builder
//!
//! Turns a set of named filters into one conjunctive [`Predicate`].

use super::predicate::Predicate;
use super::types::ToPredicate;

/// One filter bound to the attribute it constrains
pub struct FieldFilter<'a> {
    pub attribute: &'a str,
    pub column: &'a str,
    pub filter: &'a dyn ToPredicate,
}

impl<'a> FieldFilter<'a> {
    pub fn new(attribute: &'a str, column: &'a str, filter: &'a dyn ToPredicate) -> Self {
        Self {
            attribute,
            column,
            filter,
        }
    }
}

/// A per-entity set of filters, one per queryable attribute
///
/// Implementations return only the filters that are present; absent
/// attributes contribute no constraint.
pub trait Criteria {
    fn filters(&self) -> Vec<FieldFilter<'_>>;
}

/// Build the combined predicate for a criteria object
///
/// Filters are visited in attribute-name order. Each non-empty filter
/// contributes the AND of its set fields; the result is the AND over all
/// attributes. When nothing is set the result is `Predicate::All`, which
/// matches every record.
pub fn build_predicate<C: Criteria + ?Sized>(criteria: &C) -> Predicate {
    let mut filters = criteria.filters();
    filters.sort_by(|a, b| a.attribute.cmp(b.attribute));

    let mut predicate = Predicate::All;
    for field in filters {
        if field.filter.is_empty() {
            tracing::trace!(attribute = field.attribute, "Skipping empty filter");
            continue;
        }
        predicate = predicate.and(field.filter.to_predicate(field.column));
    }

    tracing::trace!(predicate = ?predicate, "Built criteria predicate");
    predicate
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::super::predicate::{CompareOp, SqlParams};
    use super::super::types::{BooleanFilter, FilterFields, LongFilter, StringFilter};
    use super::super::value::Value;
    use super::*;

    #[derive(Default)]
    struct AccountCriteria {
        id: Option<LongFilter>,
        name: Option<StringFilter>,
        active: Option<BooleanFilter>,
    }

    impl Criteria for AccountCriteria {
        fn filters(&self) -> Vec<FieldFilter<'_>> {
            let mut out = Vec::new();
            if let Some(f) = &self.name {
                out.push(FieldFilter::new("name", "display_name", f));
            }
            if let Some(f) = &self.id {
                out.push(FieldFilter::new("id", "id", f));
            }
            if let Some(f) = &self.active {
                out.push(FieldFilter::new("active", "active", f));
            }
            out
        }
    }

    fn dataset() -> Vec<BTreeMap<String, Value>> {
        let rows: [(i64, Option<&str>, bool); 4] = [
            (1, Some("alice"), true),
            (2, Some("bob"), false),
            (3, None, true),
            (4, Some("carol"), true),
        ];
        rows.iter()
            .map(|(id, name, active)| {
                let mut r = BTreeMap::new();
                r.insert("id".to_string(), Value::Integer(*id));
                if let Some(name) = name {
                    r.insert("display_name".to_string(), Value::Text(name.to_string()));
                }
                r.insert("active".to_string(), Value::Boolean(*active));
                r
            })
            .collect()
    }

    fn ids(criteria: &AccountCriteria) -> Vec<i64> {
        let predicate = build_predicate(criteria);
        dataset()
            .iter()
            .filter(|r| predicate.matches(*r))
            .filter_map(|r| match r.get("id") {
                Some(Value::Integer(id)) => Some(*id),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn no_filters_match_everything() {
        let criteria = AccountCriteria::default();
        assert_eq!(build_predicate(&criteria), Predicate::All);
        assert_eq!(ids(&criteria), vec![1, 2, 3, 4]);
    }

    #[test]
    fn present_but_empty_filters_match_everything() {
        let criteria = AccountCriteria {
            id: Some(LongFilter::new()),
            name: Some(StringFilter::new()),
            active: Some(BooleanFilter::new()),
        };
        assert_eq!(build_predicate(&criteria), Predicate::All);
        assert_eq!(ids(&criteria), vec![1, 2, 3, 4]);
    }

    #[test]
    fn equals_selects_exactly_matching_records() {
        let criteria = AccountCriteria {
            id: Some(LongFilter::new().with_equals(3)),
            ..Default::default()
        };
        assert_eq!(ids(&criteria), vec![3]);
    }

    #[test]
    fn attributes_combine_conjunctively() {
        let criteria = AccountCriteria {
            id: Some(LongFilter::new().with_greater_than(1)),
            active: Some(BooleanFilter::new().with_equals(true)),
            ..Default::default()
        };
        assert_eq!(ids(&criteria), vec![3, 4]);
    }

    #[test]
    fn specified_false_selects_absent_attribute_only() {
        let criteria = AccountCriteria {
            name: Some(StringFilter::new().with_specified(false)),
            ..Default::default()
        };
        assert_eq!(ids(&criteria), vec![3]);
    }

    #[test]
    fn fragments_follow_attribute_name_order() {
        let criteria = AccountCriteria {
            id: Some(LongFilter::new().with_less_than(10)),
            name: Some(StringFilter::new().with_equals("bob".to_string())),
            active: Some(BooleanFilter::new().with_equals(false)),
        };
        let predicate = build_predicate(&criteria);
        let mut params = SqlParams::default();

        assert_eq!(
            predicate.to_sql(&mut params),
            "active = ? AND id < ? AND display_name = ?"
        );
        assert_eq!(
            predicate,
            Predicate::And(vec![
                Predicate::compare("active", CompareOp::Eq, Value::Boolean(false)),
                Predicate::compare("id", CompareOp::Lt, Value::Integer(10)),
                Predicate::compare("display_name", CompareOp::Eq, Value::Text("bob".into())),
            ])
        );
    }
}
