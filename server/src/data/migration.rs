//! Schema migration contract
//!
//! The application only depends on [`Migrator`]; how a backend versions its
//! schema is its own concern.

use async_trait::async_trait;
use thiserror::Error;

use crate::core::executor::ExecutorError;

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration {version} ({name}) failed: {error}")]
    Failed {
        version: i32,
        name: String,
        error: String,
    },

    #[error("Could not schedule migrations: {0}")]
    Schedule(#[from] ExecutorError),
}

/// Brings the backing store's schema up to date
#[async_trait]
pub trait Migrator: Send + Sync {
    async fn run_migrations(&self) -> Result<(), MigrationError>;
}
