//! Filter parsing
//!
//! Decodes `attribute.operator=value` query parameters into [`QueryCriteria`]
//! using the attribute kinds registered in a [`CriteriaSchema`]. Parameters
//! without an `attribute.operator` key (paging, sorting) are ignored.

use std::collections::BTreeMap;

use super::codec::{
    BooleanCodec, DoubleCodec, InstantCodec, IntegerCodec, LocalDateCodec, LongCodec, TextCodec,
    UuidCodec, ValueCodec, ZonedDateTimeCodec,
};
use super::criteria::{AnyFilter, QueryCriteria};
use super::error::FilterError;
use super::schema::{Capability, CriteriaSchema, FieldKind, FieldSpec};
use super::types::{Filter, RangeFilter, StringFilter};
use super::value::{FilterValue, OrderedValue};

/// Maximum size of the query string in bytes (64KB)
const MAX_QUERY_SIZE: usize = 64 * 1024;

/// Maximum number of filter parameters allowed
const MAX_FILTERS: usize = 50;

/// Maximum number of values in one `in`/`notIn` list
const MAX_LIST_VALUES: usize = 100;

/// Filter operators as they appear in parameter names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equals,
    NotEquals,
    Specified,
    In,
    NotIn,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Contains,
    DoesNotContain,
}

impl Operator {
    pub fn parse(name: &str) -> Option<Self> {
        let op = match name {
            "equals" => Self::Equals,
            "notEquals" => Self::NotEquals,
            "specified" => Self::Specified,
            "in" => Self::In,
            "notIn" => Self::NotIn,
            "greaterThan" => Self::GreaterThan,
            "greaterThanOrEqual" => Self::GreaterThanOrEqual,
            "lessThan" => Self::LessThan,
            "lessThanOrEqual" => Self::LessThanOrEqual,
            "contains" => Self::Contains,
            "doesNotContain" => Self::DoesNotContain,
            _ => return None,
        };
        Some(op)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "notEquals",
            Self::Specified => "specified",
            Self::In => "in",
            Self::NotIn => "notIn",
            Self::GreaterThan => "greaterThan",
            Self::GreaterThanOrEqual => "greaterThanOrEqual",
            Self::LessThan => "lessThan",
            Self::LessThanOrEqual => "lessThanOrEqual",
            Self::Contains => "contains",
            Self::DoesNotContain => "doesNotContain",
        }
    }

    fn allowed_for(&self, capability: Capability) -> bool {
        match self {
            Self::Equals | Self::NotEquals | Self::Specified | Self::In | Self::NotIn => true,
            Self::GreaterThan
            | Self::GreaterThanOrEqual
            | Self::LessThan
            | Self::LessThanOrEqual => capability == Capability::Range,
            Self::Contains | Self::DoesNotContain => capability == Capability::Text,
        }
    }
}

type Assignments = Vec<(Operator, String)>;

/// Parse criteria from a raw (percent-encoded) query string
///
/// `in`/`notIn` values are comma separated. `+` is not treated as a space, so
/// date-time offsets such as `+02:00` may be sent unescaped. When the same
/// attribute and operator appear twice, the last value wins.
pub fn parse_criteria(schema: &CriteriaSchema, query: &str) -> Result<QueryCriteria, FilterError> {
    if query.len() > MAX_QUERY_SIZE {
        return Err(FilterError::QueryTooLarge {
            max: MAX_QUERY_SIZE,
        });
    }

    let query = query.strip_prefix('?').unwrap_or(query);
    let mut grouped: BTreeMap<String, Assignments> = BTreeMap::new();
    let mut count = 0;

    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode_component(raw_key)?;
        let Some((attribute, operator_name)) = key.rsplit_once('.') else {
            tracing::trace!(parameter = %key, "Ignoring non-filter parameter");
            continue;
        };

        count += 1;
        if count > MAX_FILTERS {
            return Err(FilterError::TooManyFilters { max: MAX_FILTERS });
        }

        let spec = schema
            .field(attribute)
            .ok_or_else(|| FilterError::UnknownAttribute(attribute.to_string()))?;
        let operator = Operator::parse(operator_name)
            .filter(|op| op.allowed_for(spec.capability))
            .ok_or_else(|| FilterError::UnknownOperator {
                attribute: attribute.to_string(),
                operator: operator_name.to_string(),
            })?;

        let value = decode_component(raw_value)?;
        grouped
            .entry(attribute.to_string())
            .or_default()
            .push((operator, value));
    }

    let mut criteria = QueryCriteria::new();
    for (attribute, assignments) in grouped {
        let Some(spec) = schema.field(&attribute) else {
            continue;
        };
        let filter = decode_filter(spec, &assignments)?;
        criteria.insert(&spec.attribute, &spec.column, filter);
    }

    tracing::debug!(
        entity = schema.entity(),
        filters = criteria.len(),
        "Parsed criteria"
    );
    Ok(criteria)
}

fn decode_component(raw: &str) -> Result<String, FilterError> {
    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| FilterError::InvalidEncoding(raw.to_string()))
}

fn decode_filter(spec: &FieldSpec, assignments: &[(Operator, String)]) -> Result<AnyFilter, FilterError> {
    let attribute = spec.attribute.as_str();
    let filter = match spec.kind {
        FieldKind::Integer => AnyFilter::Integer(decode_range(&IntegerCodec, attribute, assignments)?),
        FieldKind::Long => AnyFilter::Long(decode_range(&LongCodec, attribute, assignments)?),
        FieldKind::Double => AnyFilter::Double(decode_range(&DoubleCodec, attribute, assignments)?),
        FieldKind::LocalDate => {
            AnyFilter::LocalDate(decode_range(&LocalDateCodec, attribute, assignments)?)
        }
        FieldKind::ZonedDateTime => {
            AnyFilter::ZonedDateTime(decode_range(&ZonedDateTimeCodec, attribute, assignments)?)
        }
        FieldKind::Instant => AnyFilter::Instant(decode_range(&InstantCodec, attribute, assignments)?),
        FieldKind::Text => AnyFilter::Text(decode_text(attribute, assignments)?),
        FieldKind::Boolean => {
            AnyFilter::Boolean(decode_equality(&BooleanCodec, attribute, assignments)?)
        }
        FieldKind::Uuid => AnyFilter::Uuid(decode_equality(&UuidCodec, attribute, assignments)?),
    };
    Ok(filter)
}

fn decode_range<T, C>(
    codec: &C,
    attribute: &str,
    assignments: &[(Operator, String)],
) -> Result<RangeFilter<T>, FilterError>
where
    T: OrderedValue,
    C: ValueCodec<T>,
{
    let mut filter = RangeFilter::default();
    for (operator, raw) in assignments {
        let bound = match operator {
            Operator::GreaterThan => &mut filter.greater_than,
            Operator::GreaterThanOrEqual => &mut filter.greater_than_or_equal,
            Operator::LessThan => &mut filter.less_than,
            Operator::LessThanOrEqual => &mut filter.less_than_or_equal,
            _ => {
                apply_equality(&mut filter.base, codec, attribute, *operator, raw)?;
                continue;
            }
        };
        *bound = Some(decode_value(codec, attribute, *operator, raw)?);
    }
    Ok(filter)
}

fn decode_text(attribute: &str, assignments: &[(Operator, String)]) -> Result<StringFilter, FilterError> {
    let mut filter = StringFilter::default();
    for (operator, raw) in assignments {
        match operator {
            Operator::Contains => filter.contains = Some(raw.clone()),
            Operator::DoesNotContain => filter.does_not_contain = Some(raw.clone()),
            _ => apply_equality(&mut filter.base, &TextCodec, attribute, *operator, raw)?,
        }
    }
    Ok(filter)
}

fn decode_equality<T, C>(
    codec: &C,
    attribute: &str,
    assignments: &[(Operator, String)],
) -> Result<Filter<T>, FilterError>
where
    T: FilterValue,
    C: ValueCodec<T>,
{
    let mut filter = Filter::default();
    for (operator, raw) in assignments {
        apply_equality(&mut filter, codec, attribute, *operator, raw)?;
    }
    Ok(filter)
}

fn apply_equality<T, C>(
    filter: &mut Filter<T>,
    codec: &C,
    attribute: &str,
    operator: Operator,
    raw: &str,
) -> Result<(), FilterError>
where
    T: FilterValue,
    C: ValueCodec<T>,
{
    match operator {
        Operator::Equals => filter.equals = Some(decode_value(codec, attribute, operator, raw)?),
        Operator::NotEquals => {
            filter.not_equals = Some(decode_value(codec, attribute, operator, raw)?)
        }
        Operator::Specified => {
            filter.specified = Some(decode_value(&BooleanCodec, attribute, operator, raw)?)
        }
        Operator::In => filter.in_values = Some(decode_list(codec, attribute, operator, raw)?),
        Operator::NotIn => {
            filter.not_in_values = Some(decode_list(codec, attribute, operator, raw)?)
        }
        _ => {
            return Err(FilterError::UnknownOperator {
                attribute: attribute.to_string(),
                operator: operator.as_str().to_string(),
            });
        }
    }
    Ok(())
}

fn decode_value<T, C: ValueCodec<T>>(
    codec: &C,
    attribute: &str,
    operator: Operator,
    raw: &str,
) -> Result<T, FilterError> {
    codec.decode(raw).map_err(|source| FilterError::InvalidValue {
        attribute: attribute.to_string(),
        operator: operator.as_str().to_string(),
        value: raw.to_string(),
        source,
    })
}

fn decode_list<T, C: ValueCodec<T>>(
    codec: &C,
    attribute: &str,
    operator: Operator,
    raw: &str,
) -> Result<Vec<T>, FilterError> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    let items: Vec<&str> = raw.split(',').collect();
    if items.len() > MAX_LIST_VALUES {
        return Err(FilterError::TooManyValues {
            attribute: attribute.to_string(),
            operator: operator.as_str().to_string(),
            max: MAX_LIST_VALUES,
        });
    }
    items
        .into_iter()
        .map(|item| decode_value(codec, attribute, operator, item))
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone};

    use super::super::builder::build_predicate;
    use super::super::types::{FilterFields, LongFilter};
    use super::*;

    fn schema() -> CriteriaSchema {
        CriteriaSchema::builder("user")
            .field(FieldSpec::range("id", FieldKind::Long))
            .field(FieldSpec::text("login"))
            .field(FieldSpec::equality("activated", FieldKind::Boolean))
            .field(FieldSpec::range("createdDate", FieldKind::ZonedDateTime).column("created_date"))
            .field(FieldSpec::equality("age", FieldKind::Integer))
            .build()
            .unwrap()
    }

    #[test]
    fn parses_range_and_equality_operators() {
        let criteria = parse_criteria(&schema(), "id.greaterThanOrEqual=10&id.lessThan=20&id.notEquals=15")
            .unwrap();

        let expected = LongFilter::new()
            .with_greater_than_or_equal(10)
            .with_less_than(20)
            .with_not_equals(15);
        assert_eq!(criteria.get("id"), Some(&AnyFilter::Long(expected)));
    }

    #[test]
    fn parses_membership_lists() {
        let criteria = parse_criteria(&schema(), "id.in=3,1,2&login.notIn=root,admin").unwrap();

        match criteria.get("id") {
            Some(AnyFilter::Long(f)) => assert_eq!(f.base.in_values, Some(vec![3, 1, 2])),
            other => panic!("unexpected filter {:?}", other),
        }
        match criteria.get("login") {
            Some(AnyFilter::Text(f)) => assert_eq!(
                f.base.not_in_values,
                Some(vec!["root".to_string(), "admin".to_string()])
            ),
            other => panic!("unexpected filter {:?}", other),
        }
    }

    #[test]
    fn parses_zoned_datetime_with_unescaped_offset() {
        let criteria = parse_criteria(&schema(), "createdDate.greaterThan=2024-01-01T10:00:00+02:00").unwrap();
        let expected = FixedOffset::east_opt(7200)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 1, 10, 0, 0)
            .unwrap();

        match criteria.get("createdDate") {
            Some(AnyFilter::ZonedDateTime(f)) => assert_eq!(f.greater_than, Some(expected)),
            other => panic!("unexpected filter {:?}", other),
        }
    }

    #[test]
    fn decodes_percent_encoded_values() {
        let criteria = parse_criteria(
            &schema(),
            "createdDate.lessThan=2024-01-01T10%3A00%3A00%2B02%3A00&login.contains=a%20b",
        )
        .unwrap();

        assert!(matches!(criteria.get("createdDate"), Some(AnyFilter::ZonedDateTime(_))));
        match criteria.get("login") {
            Some(AnyFilter::Text(f)) => assert_eq!(f.contains.as_deref(), Some("a b")),
            other => panic!("unexpected filter {:?}", other),
        }
    }

    #[test]
    fn malformed_timestamp_is_a_format_error() {
        let err = parse_criteria(&schema(), "createdDate.equals=2024-13-01").unwrap_err();
        assert_eq!(err.code(), "INVALID_FILTER_VALUE");
        assert!(matches!(
            err,
            FilterError::InvalidValue { ref attribute, ref operator, .. }
                if attribute == "createdDate" && operator == "equals"
        ));
    }

    #[test]
    fn one_bad_list_member_rejects_the_request() {
        let err = parse_criteria(&schema(), "id.in=1,two,3").unwrap_err();
        assert!(matches!(err, FilterError::InvalidValue { ref value, .. } if value == "two"));
    }

    #[test]
    fn unknown_attribute_is_rejected() {
        let err = parse_criteria(&schema(), "password.equals=x").unwrap_err();
        assert_eq!(err, FilterError::UnknownAttribute("password".into()));
    }

    #[test]
    fn range_operator_on_equality_field_is_rejected() {
        let err = parse_criteria(&schema(), "activated.greaterThan=true").unwrap_err();
        assert_eq!(err.code(), "INVALID_FILTER_OPERATOR");

        let err = parse_criteria(&schema(), "age.lessThan=3").unwrap_err();
        assert_eq!(err.code(), "INVALID_FILTER_OPERATOR");
    }

    #[test]
    fn contains_only_on_text_fields() {
        assert!(parse_criteria(&schema(), "login.contains=adm").is_ok());
        let err = parse_criteria(&schema(), "id.contains=1").unwrap_err();
        assert!(matches!(err, FilterError::UnknownOperator { .. }));
    }

    #[test]
    fn unknown_operator_is_rejected() {
        let err = parse_criteria(&schema(), "id.between=1").unwrap_err();
        assert_eq!(
            err,
            FilterError::UnknownOperator {
                attribute: "id".into(),
                operator: "between".into(),
            }
        );
    }

    #[test]
    fn specified_requires_boolean() {
        let criteria = parse_criteria(&schema(), "login.specified=false").unwrap();
        match criteria.get("login") {
            Some(AnyFilter::Text(f)) => assert_eq!(f.base.specified, Some(false)),
            other => panic!("unexpected filter {:?}", other),
        }
        assert!(parse_criteria(&schema(), "login.specified=maybe").is_err());
    }

    #[test]
    fn paging_parameters_are_ignored() {
        let criteria = parse_criteria(&schema(), "?page=0&size=20&sort=id,asc&activated.equals=true").unwrap();
        assert_eq!(criteria.len(), 1);
    }

    #[test]
    fn empty_query_matches_everything() {
        let criteria = parse_criteria(&schema(), "").unwrap();
        assert!(criteria.is_empty());
        assert!(build_predicate(&criteria).is_all());
    }

    #[test]
    fn last_duplicate_wins() {
        let criteria = parse_criteria(&schema(), "id.equals=1&id.equals=2").unwrap();
        match criteria.get("id") {
            Some(AnyFilter::Long(f)) => assert_eq!(f.base.equals, Some(2)),
            other => panic!("unexpected filter {:?}", other),
        }
    }

    #[test]
    fn too_many_filters() {
        let query: Vec<String> = (0..=MAX_FILTERS).map(|i| format!("id.notEquals={}", i)).collect();
        let err = parse_criteria(&schema(), &query.join("&")).unwrap_err();
        assert_eq!(err, FilterError::TooManyFilters { max: MAX_FILTERS });
    }

    #[test]
    fn too_many_list_values() {
        let values: Vec<String> = (0..=MAX_LIST_VALUES).map(|i| i.to_string()).collect();
        let err = parse_criteria(&schema(), &format!("id.in={}", values.join(","))).unwrap_err();
        assert_eq!(err.code(), "TOO_MANY_FILTER_VALUES");
    }

    #[test]
    fn oversized_query_is_rejected() {
        let query = "a".repeat(MAX_QUERY_SIZE + 1);
        let err = parse_criteria(&schema(), &query).unwrap_err();
        assert_eq!(err, FilterError::QueryTooLarge { max: MAX_QUERY_SIZE });
    }

    #[test]
    fn invalid_percent_encoding_is_rejected() {
        let err = parse_criteria(&schema(), "login.equals=%FF").unwrap_err();
        assert_eq!(err.code(), "INVALID_FILTER_ENCODING");
    }

    #[test]
    fn mapped_column_reaches_predicate() {
        let criteria = parse_criteria(&schema(), "createdDate.specified=true").unwrap();
        let mut params = super::super::predicate::SqlParams::default();
        assert_eq!(
            build_predicate(&criteria).to_sql(&mut params),
            "created_date IS NOT NULL"
        );
    }
}
