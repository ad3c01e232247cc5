//! Query criteria system
//!
//! Filter value objects describe the constraints a caller wants applied to one
//! attribute (equality, presence, membership, ordering bounds, substrings).
//! The predicate builder combines the filters of a criteria object into a
//! single conjunctive [`Predicate`], which can be rendered to SQL or evaluated
//! in memory.
//!
//! ## Usage
//!
//! ```no_run
//! use mimiron_server::data::filters::{
//!     build_predicate, parse_criteria, CriteriaSchema, FieldKind, FieldSpec, SqlParams,
//! };
//!
//! let schema = CriteriaSchema::builder("user")
//!     .field(FieldSpec::range("id", FieldKind::Long))
//!     .field(FieldSpec::text("login"))
//!     .build()
//!     .unwrap();
//! let criteria = parse_criteria(&schema, "id.greaterThan=10&login.contains=adm").unwrap();
//! let mut params = SqlParams::default();
//! let sql = build_predicate(&criteria).to_sql(&mut params);
//! ```

mod builder;
mod codec;
mod criteria;
mod error;
mod parser;
mod predicate;
mod schema;
mod types;
mod value;

pub use builder::{Criteria, FieldFilter, build_predicate};
pub use codec::{
    BooleanCodec, CodecError, DoubleCodec, InstantCodec, IntegerCodec, LocalDateCodec, LongCodec,
    TextCodec, UuidCodec, ValueCodec, ZonedDateTimeCodec,
};
pub use criteria::{AnyFilter, CriteriaEntry, QueryCriteria};
pub use error::{FilterError, SchemaError};
pub use parser::{Operator, parse_criteria};
pub use predicate::{CompareOp, Predicate, SqlParams};
pub use schema::{Capability, CriteriaSchema, CriteriaSchemaBuilder, FieldKind, FieldSpec};
pub use types::{
    BooleanFilter, DoubleFilter, Filter, FilterFields, InstantFilter, IntegerFilter,
    LocalDateFilter, LongFilter, RangeFilter, StringFilter, ToPredicate, UuidFilter,
    ZonedDateTimeFilter,
};
pub use value::{FilterValue, OrderedValue, Record, Value};
