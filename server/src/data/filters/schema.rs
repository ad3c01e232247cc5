//! Filterable attribute registry
//!
//! A [`CriteriaSchema`] whitelists the attributes of one entity that may be
//! filtered, maps them to storage columns, and pins each attribute's value
//! kind (and therefore its wire codec). Schemas are built once at startup;
//! every capability mismatch is reported by [`CriteriaSchemaBuilder::build`].

use std::collections::BTreeMap;
use std::fmt;

use super::error::SchemaError;

/// Value kind of a filterable attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Long,
    Double,
    Text,
    Boolean,
    Uuid,
    LocalDate,
    ZonedDateTime,
    Instant,
}

impl FieldKind {
    /// Whether range bounds are meaningful for this kind
    pub fn is_orderable(&self) -> bool {
        !matches!(self, Self::Text | Self::Boolean | Self::Uuid)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Long => "long",
            Self::Double => "double",
            Self::Text => "text",
            Self::Boolean => "boolean",
            Self::Uuid => "uuid",
            Self::LocalDate => "local-date",
            Self::ZonedDateTime => "zoned-date-time",
            Self::Instant => "instant",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which operator family an attribute accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// equals, notEquals, specified, in, notIn
    Equality,
    /// Equality plus greaterThan, greaterThanOrEqual, lessThan, lessThanOrEqual
    Range,
    /// Equality plus contains, doesNotContain
    Text,
}

/// One filterable attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub attribute: String,
    pub column: String,
    pub kind: FieldKind,
    pub capability: Capability,
}

impl FieldSpec {
    pub fn new(attribute: &str, kind: FieldKind, capability: Capability) -> Self {
        Self {
            attribute: attribute.to_string(),
            column: attribute.to_string(),
            kind,
            capability,
        }
    }

    pub fn equality(attribute: &str, kind: FieldKind) -> Self {
        Self::new(attribute, kind, Capability::Equality)
    }

    pub fn range(attribute: &str, kind: FieldKind) -> Self {
        Self::new(attribute, kind, Capability::Range)
    }

    pub fn text(attribute: &str) -> Self {
        Self::new(attribute, FieldKind::Text, Capability::Text)
    }

    /// Store under a column name different from the attribute name
    pub fn column(mut self, column: &str) -> Self {
        self.column = column.to_string();
        self
    }

    fn validate(&self) -> Result<(), SchemaError> {
        let valid_name = !self.attribute.is_empty()
            && self
                .attribute
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid_name {
            return Err(SchemaError::InvalidName(self.attribute.clone()));
        }
        match self.capability {
            Capability::Range if !self.kind.is_orderable() => Err(SchemaError::NotOrderable {
                attribute: self.attribute.clone(),
                kind: self.kind.as_str(),
            }),
            Capability::Text if self.kind != FieldKind::Text => Err(SchemaError::NotText {
                attribute: self.attribute.clone(),
                kind: self.kind.as_str(),
            }),
            _ => Ok(()),
        }
    }
}

/// Validated set of filterable attributes for one entity
#[derive(Debug, Clone)]
pub struct CriteriaSchema {
    entity: String,
    fields: BTreeMap<String, FieldSpec>,
}

impl CriteriaSchema {
    pub fn builder(entity: &str) -> CriteriaSchemaBuilder {
        CriteriaSchemaBuilder {
            entity: entity.to_string(),
            fields: Vec::new(),
        }
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn field(&self, attribute: &str) -> Option<&FieldSpec> {
        self.fields.get(attribute)
    }

    /// Attributes in name order
    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.values()
    }
}

pub struct CriteriaSchemaBuilder {
    entity: String,
    fields: Vec<FieldSpec>,
}

impl CriteriaSchemaBuilder {
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    pub fn build(self) -> Result<CriteriaSchema, SchemaError> {
        let mut fields = BTreeMap::new();
        for spec in self.fields {
            spec.validate()?;
            if fields.contains_key(&spec.attribute) {
                return Err(SchemaError::DuplicateAttribute(spec.attribute));
            }
            fields.insert(spec.attribute.clone(), spec);
        }
        tracing::debug!(
            entity = %self.entity,
            fields = fields.len(),
            "Criteria schema registered"
        );
        Ok(CriteriaSchema {
            entity: self.entity,
            fields,
        })
    }
}
