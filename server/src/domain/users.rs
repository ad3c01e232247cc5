//! User accounts and their filterable attributes

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::filters::{
    BooleanFilter, Criteria, CriteriaSchema, FieldFilter, FieldKind, FieldSpec, InstantFilter,
    LongFilter, Record, SchemaError, StringFilter, Value, ZonedDateTimeFilter,
};

/// Storage table
pub const TABLE: &str = "app_user";

/// Wire attribute name → storage column
const COLUMNS: &[(&str, &str)] = &[
    ("id", "id"),
    ("login", "login"),
    ("email", "email"),
    ("firstName", "first_name"),
    ("lastName", "last_name"),
    ("activated", "activated"),
    ("langKey", "lang_key"),
    ("createdDate", "created_date"),
    ("lastModifiedDate", "last_modified_date"),
];

fn column(attribute: &'static str) -> &'static str {
    COLUMNS
        .iter()
        .find(|(a, _)| *a == attribute)
        .map(|(_, c)| *c)
        .unwrap_or(attribute)
}

/// Registry of user attributes accepted in query strings
pub fn schema() -> Result<CriteriaSchema, SchemaError> {
    CriteriaSchema::builder(TABLE)
        .field(FieldSpec::range("id", FieldKind::Long))
        .field(FieldSpec::text("login"))
        .field(FieldSpec::text("email"))
        .field(FieldSpec::text("firstName").column(column("firstName")))
        .field(FieldSpec::text("lastName").column(column("lastName")))
        .field(FieldSpec::equality("activated", FieldKind::Boolean))
        .field(FieldSpec::text("langKey").column(column("langKey")))
        .field(
            FieldSpec::range("createdDate", FieldKind::ZonedDateTime)
                .column(column("createdDate")),
        )
        .field(
            FieldSpec::range("lastModifiedDate", FieldKind::Instant)
                .column(column("lastModifiedDate")),
        )
        .build()
}

/// Typed criteria for user queries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<LongFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login: Option<StringFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<StringFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<StringFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<StringFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activated: Option<BooleanFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang_key: Option<StringFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date: Option<ZonedDateTimeFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_date: Option<InstantFilter>,
}

impl Criteria for UserCriteria {
    fn filters(&self) -> Vec<FieldFilter<'_>> {
        let mut out = Vec::new();
        macro_rules! field {
            ($name:literal, $field:expr) => {
                if let Some(filter) = &$field {
                    out.push(FieldFilter::new($name, column($name), filter));
                }
            };
        }
        field!("id", self.id);
        field!("login", self.login);
        field!("email", self.email);
        field!("firstName", self.first_name);
        field!("lastName", self.last_name);
        field!("activated", self.activated);
        field!("langKey", self.lang_key);
        field!("createdDate", self.created_date);
        field!("lastModifiedDate", self.last_modified_date);
        out
    }
}

impl fmt::Display for UserCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        macro_rules! part {
            ($name:literal, $field:expr) => {
                if let Some(filter) = &$field {
                    parts.push(format!("{}={}", $name, filter));
                }
            };
        }
        part!("id", self.id);
        part!("login", self.login);
        part!("email", self.email);
        part!("firstName", self.first_name);
        part!("lastName", self.last_name);
        part!("activated", self.activated);
        part!("langKey", self.lang_key);
        part!("createdDate", self.created_date);
        part!("lastModifiedDate", self.last_modified_date);
        write!(f, "UserCriteria{{{}}}", parts.join(", "))
    }
}

/// A stored user account
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub login: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub activated: bool,
    pub lang_key: Option<String>,
    pub created_date: DateTime<Utc>,
    pub last_modified_date: Option<DateTime<Utc>>,
}

impl Record for User {
    fn get(&self, column: &str) -> Option<Value> {
        let text = |v: &Option<String>| v.clone().map(Value::Text);
        match column {
            "id" => Some(Value::Integer(self.id)),
            "login" => Some(Value::Text(self.login.clone())),
            "email" => text(&self.email),
            "first_name" => text(&self.first_name),
            "last_name" => text(&self.last_name),
            "activated" => Some(Value::Boolean(self.activated)),
            "lang_key" => text(&self.lang_key),
            "created_date" => Some(Value::Timestamp(self.created_date)),
            "last_modified_date" => self.last_modified_date.map(Value::Timestamp),
            _ => None,
        }
    }
}
