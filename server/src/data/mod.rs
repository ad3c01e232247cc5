//! Data layer
//!
//! - `filters` - Criteria filters, predicates and query-string decoding
//! - `migration` - Schema migration contract
//! - `sqlite` - Embedded SQLite store and its migrations

pub mod filters;
pub mod migration;
pub mod sqlite;

pub use migration::{MigrationError, Migrator};
pub use sqlite::SqliteService;
