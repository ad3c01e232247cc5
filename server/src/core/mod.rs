//! Core application infrastructure

pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod constants;
pub mod executor;
pub mod shutdown;

pub use crate::app::CoreApp;
pub use bootstrap::{MigrationBootstrap, MigrationMode, MigrationOutcome};
pub use cli::{CliConfig, Commands};
pub use config::{AppConfig, Profiles};
pub use executor::{ExecutorConfig, ExecutorError, TaskExecutor};
pub use shutdown::ShutdownService;
