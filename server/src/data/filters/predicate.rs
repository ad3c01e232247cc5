//! Combined query predicates
//!
//! A [`Predicate`] is the output of the predicate builder. It can be
//! evaluated in memory against a [`Record`] or rendered to a parameterized SQL
//! `WHERE` fragment. Both forms share the same semantics: any comparison
//! against a null attribute is false, and only a presence check selects nulls.

use std::cmp::Ordering;

use crate::utils::sql::contains_pattern;

use super::value::{Record, Value};

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }

    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
            Self::Gt => ordering == Ordering::Greater,
            Self::Gte => ordering != Ordering::Less,
            Self::Lt => ordering == Ordering::Less,
            Self::Lte => ordering != Ordering::Greater,
        }
    }
}

/// A boolean condition over one record
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every record
    All,
    /// Conjunction of two or more predicates
    And(Vec<Predicate>),
    Compare {
        column: String,
        op: CompareOp,
        value: Value,
    },
    In {
        column: String,
        values: Vec<Value>,
        negated: bool,
    },
    /// `present = true` selects non-null attributes, `false` selects nulls
    Presence { column: String, present: bool },
    /// Case-insensitive substring match on text attributes
    Contains {
        column: String,
        needle: String,
        negated: bool,
    },
}

/// Collects SQL parameters during rendering (maintains placeholder order)
#[derive(Debug, Default)]
pub struct SqlParams {
    pub values: Vec<Value>,
}

impl Predicate {
    pub fn compare(column: &str, op: CompareOp, value: Value) -> Self {
        Self::Compare {
            column: column.to_string(),
            op,
            value,
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// AND two predicates, flattening nested conjunctions. `All` is the identity.
    pub fn and(self, other: Predicate) -> Predicate {
        match (self, other) {
            (Self::All, p) | (p, Self::All) => p,
            (Self::And(mut left), Self::And(right)) => {
                left.extend(right);
                Self::And(left)
            }
            (Self::And(mut left), p) => {
                left.push(p);
                Self::And(left)
            }
            (p, Self::And(right)) => {
                let mut parts = Vec::with_capacity(right.len() + 1);
                parts.push(p);
                parts.extend(right);
                Self::And(parts)
            }
            (a, b) => Self::And(vec![a, b]),
        }
    }

    /// AND a sequence of predicates; an empty sequence yields `All`
    pub fn all_of<I: IntoIterator<Item = Predicate>>(parts: I) -> Predicate {
        parts.into_iter().fold(Self::All, Self::and)
    }

    /// Evaluate against one record
    pub fn matches(&self, record: &dyn Record) -> bool {
        match self {
            Self::All => true,
            Self::And(parts) => parts.iter().all(|p| p.matches(record)),
            Self::Compare { column, op, value } => record
                .get(column)
                .and_then(|actual| actual.compare(value))
                .is_some_and(|ordering| op.accepts(ordering)),
            Self::In {
                column,
                values,
                negated,
            } => {
                if values.is_empty() {
                    return *negated;
                }
                let Some(actual) = record.get(column) else {
                    return false;
                };
                // NOT IN over incomparable members is unknown, hence false
                if *negated {
                    values
                        .iter()
                        .all(|v| matches!(actual.compare(v), Some(o) if o != Ordering::Equal))
                } else {
                    values.iter().any(|v| actual.same_as(v))
                }
            }
            Self::Presence { column, present } => record.get(column).is_some() == *present,
            Self::Contains {
                column,
                needle,
                negated,
            } => match record.get(column) {
                Some(Value::Text(text)) => {
                    text.to_ascii_uppercase()
                        .contains(&needle.to_ascii_uppercase())
                        != *negated
                }
                _ => false,
            },
        }
    }

    /// Generate SQL WHERE clause fragment
    /// Returns the SQL clause with ? placeholders and updates params
    pub fn to_sql(&self, params: &mut SqlParams) -> String {
        self.to_sql_aliased(params, |col| col, "")
    }

    /// Generate SQL WHERE clause fragment with column name mapping and table alias
    ///
    /// The alias is prepended to column names (e.g., "u" → "u.login").
    /// Pass empty string for no alias.
    pub fn to_sql_aliased<'a, F>(&'a self, params: &mut SqlParams, mapper: F, alias: &str) -> String
    where
        F: Fn(&'a str) -> &'a str + Copy,
    {
        let format_col = |col: &'a str| -> String {
            let col = mapper(col);
            if alias.is_empty() {
                col.to_string()
            } else {
                format!("{}.{}", alias, col)
            }
        };

        match self {
            Self::All => "1=1".to_string(),
            Self::And(parts) => {
                if parts.is_empty() {
                    return "1=1".to_string();
                }
                parts
                    .iter()
                    .map(|p| match p {
                        Self::And(_) => format!("({})", p.to_sql_aliased(params, mapper, alias)),
                        _ => p.to_sql_aliased(params, mapper, alias),
                    })
                    .collect::<Vec<_>>()
                    .join(" AND ")
            }
            Self::Compare { column, op, value } => {
                params.values.push(value.clone());
                format!("{} {} ?", format_col(column), op.as_sql())
            }
            Self::In {
                column,
                values,
                negated,
            } => {
                if values.is_empty() {
                    let constant = if *negated { "1=1" } else { "1=0" };
                    return constant.to_string();
                }
                let placeholders: Vec<&str> = values.iter().map(|_| "?").collect();
                params.values.extend(values.iter().cloned());
                let keyword = if *negated { "NOT IN" } else { "IN" };
                format!(
                    "{} {} ({})",
                    format_col(column),
                    keyword,
                    placeholders.join(", ")
                )
            }
            Self::Presence { column, present } => {
                let check = if *present { "IS NOT NULL" } else { "IS NULL" };
                format!("{} {}", format_col(column), check)
            }
            Self::Contains {
                column,
                needle,
                negated,
            } => {
                params.values.push(Value::Text(contains_pattern(needle)));
                let keyword = if *negated { "NOT LIKE" } else { "LIKE" };
                format!("UPPER({}) {} ? ESCAPE '\\'", format_col(column), keyword)
            }
        }
    }
}
