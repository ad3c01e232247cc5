//! SQLite database service
//!
//! Embedded store backing the user registry. Configured with:
//! - WAL mode for concurrent reads during writes
//! - In-memory temp storage for fast queries
//!
//! Schema changes are not applied here; they go through [`SqliteMigrator`] so
//! the startup bootstrap decides when they run.

pub mod error;
mod migrations;
pub mod schema;

pub use error::SqliteError;
pub use migrations::SqliteMigrator;
pub use sqlx::SqlitePool;

use std::time::Duration;

use sqlx::ConnectOptions;
use sqlx::Sqlite;
use sqlx::query::{Query, QueryAs};
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions,
    SqliteSynchronous,
};
use tracing::log::LevelFilter;

use crate::core::config::DatabaseConfig;
use crate::core::constants::{SQLITE_BUSY_TIMEOUT_SECS, SQLITE_CACHE_SIZE};
use crate::data::filters::{SqlParams, Value};

/// SQLite database service
///
/// Should be created once at startup and shared with whoever needs the pool.
pub struct SqliteService {
    pool: SqlitePool,
}

impl SqliteService {
    /// Open (or create) the database file named by the configuration
    pub async fn init(config: &DatabaseConfig) -> Result<Self, SqliteError> {
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(SQLITE_BUSY_TIMEOUT_SECS))
            .pragma("cache_size", SQLITE_CACHE_SIZE)
            .pragma("temp_store", "MEMORY")
            .log_statements(LevelFilter::Trace);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        tracing::debug!(path = %config.path.display(), "SqliteService initialized");
        Ok(Self { pool })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Migrator bound to this service's pool
    pub fn migrator(&self) -> SqliteMigrator {
        SqliteMigrator::new(self.pool.clone())
    }

    /// Close the connection pool gracefully
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::debug!("SQLite pool closed");
    }
}

/// A filter value in the primitive form stored by the schema
#[derive(Debug, Clone, PartialEq)]
enum StoredValue {
    Integer(i64),
    Real(f64),
    Text(String),
    Boolean(bool),
}

impl From<&Value> for StoredValue {
    /// Timestamps become epoch microseconds, dates `YYYY-MM-DD`, UUIDs hyphenated text
    fn from(value: &Value) -> Self {
        match value {
            Value::Integer(v) => Self::Integer(*v),
            Value::Double(v) => Self::Real(*v),
            Value::Text(v) => Self::Text(v.clone()),
            Value::Boolean(v) => Self::Boolean(*v),
            Value::Timestamp(v) => Self::Integer(v.timestamp_micros()),
            Value::Date(v) => Self::Text(v.format("%Y-%m-%d").to_string()),
            Value::Uuid(v) => Self::Text(v.hyphenated().to_string()),
        }
    }
}

/// Binds filter values in the storage encoding used by the schema
pub trait BindParams: Sized {
    fn bind_filter_value(self, value: &Value) -> Self;

    fn bind_filter_params(self, params: &SqlParams) -> Self {
        params.values.iter().fold(self, |q, v| q.bind_filter_value(v))
    }
}

macro_rules! bind_stored {
    ($query:expr, $value:expr) => {
        match StoredValue::from($value) {
            StoredValue::Integer(v) => $query.bind(v),
            StoredValue::Real(v) => $query.bind(v),
            StoredValue::Text(v) => $query.bind(v),
            StoredValue::Boolean(v) => $query.bind(v),
        }
    };
}

impl<'q> BindParams for Query<'q, Sqlite, SqliteArguments<'q>> {
    fn bind_filter_value(self, value: &Value) -> Self {
        bind_stored!(self, value)
    }
}

impl<'q, O> BindParams for QueryAs<'q, Sqlite, O, SqliteArguments<'q>> {
    fn bind_filter_value(self, value: &Value) -> Self {
        bind_stored!(self, value)
    }
}
