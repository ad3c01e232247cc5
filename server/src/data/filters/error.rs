//! Filter error types

use thiserror::Error;

use super::codec::CodecError;

/// Request-level errors raised while decoding criteria (client errors)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("Query string exceeds maximum size of {max} bytes")]
    QueryTooLarge { max: usize },

    #[error("Maximum {max} filters allowed")]
    TooManyFilters { max: usize },

    #[error("Maximum {max} values allowed for {attribute}.{operator}")]
    TooManyValues {
        attribute: String,
        operator: String,
        max: usize,
    },

    #[error("Invalid percent-encoding in query parameter '{0}'")]
    InvalidEncoding(String),

    #[error("Cannot filter by attribute: {0}")]
    UnknownAttribute(String),

    #[error("Unsupported operator '{operator}' for attribute {attribute}")]
    UnknownOperator { attribute: String, operator: String },

    #[error("Invalid value '{value}' for {attribute}.{operator}: {source}")]
    InvalidValue {
        attribute: String,
        operator: String,
        value: String,
        #[source]
        source: CodecError,
    },
}

impl FilterError {
    /// Stable machine-readable code returned to the client
    pub fn code(&self) -> &'static str {
        match self {
            Self::QueryTooLarge { .. } => "FILTER_QUERY_TOO_LARGE",
            Self::TooManyFilters { .. } => "TOO_MANY_FILTERS",
            Self::TooManyValues { .. } => "TOO_MANY_FILTER_VALUES",
            Self::InvalidEncoding(_) => "INVALID_FILTER_ENCODING",
            Self::UnknownAttribute(_) => "INVALID_FILTER_COLUMN",
            Self::UnknownOperator { .. } => "INVALID_FILTER_OPERATOR",
            Self::InvalidValue { .. } => "INVALID_FILTER_VALUE",
        }
    }
}

/// Configuration errors raised while building a criteria schema
///
/// These are programming errors and abort startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Attribute {attribute} of kind {kind} has no total order and cannot take range constraints")]
    NotOrderable {
        attribute: String,
        kind: &'static str,
    },

    #[error("Attribute {attribute} of kind {kind} cannot take text constraints")]
    NotText {
        attribute: String,
        kind: &'static str,
    },

    #[error("Attribute {0} is registered more than once")]
    DuplicateAttribute(String),

    #[error("Attribute name '{0}' is invalid")]
    InvalidName(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_value_display_includes_reason() {
        let err = FilterError::InvalidValue {
            attribute: "createdDate".into(),
            operator: "greaterThan".into(),
            value: "yesterday".into(),
            source: CodecError {
                expected: "ISO-8601 date-time with offset",
                reason: "input contains invalid characters".into(),
            },
        };
        assert_eq!(
            err.to_string(),
            "Invalid value 'yesterday' for createdDate.greaterThan: \
             expected ISO-8601 date-time with offset: input contains invalid characters"
        );
        assert_eq!(err.code(), "INVALID_FILTER_VALUE");
    }

    #[test]
    fn not_orderable_display() {
        let err = SchemaError::NotOrderable {
            attribute: "activated".into(),
            kind: "boolean",
        };
        assert_eq!(
            err.to_string(),
            "Attribute activated of kind boolean has no total order and cannot take range constraints"
        );
    }
}
