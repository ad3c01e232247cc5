use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::constants::{
    ENV_CONFIG, ENV_DATABASE_MAX_CONNECTIONS, ENV_DATABASE_PATH, ENV_EXECUTOR_CORE_POOL_SIZE,
    ENV_EXECUTOR_MAX_POOL_SIZE, ENV_EXECUTOR_QUEUE_CAPACITY, ENV_PROFILES,
};

#[derive(Parser)]
#[command(name = "mimiron")]
#[command(version, about = "User registry with criteria-based filtering", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Active profiles, comma separated (e.g. dev,no-migrations)
    #[arg(long, short = 'P', global = true, env = ENV_PROFILES)]
    pub profiles: Option<String>,

    // Database options
    /// SQLite database file
    #[arg(long, global = true, env = ENV_DATABASE_PATH)]
    pub database_path: Option<PathBuf>,

    /// Maximum pooled database connections
    #[arg(long, global = true, env = ENV_DATABASE_MAX_CONNECTIONS)]
    pub database_max_connections: Option<u32>,

    // Executor options
    /// Background workers kept alive while idle
    #[arg(long, global = true, env = ENV_EXECUTOR_CORE_POOL_SIZE)]
    pub executor_core_pool_size: Option<usize>,

    /// Upper bound on background workers
    #[arg(long, global = true, env = ENV_EXECUTOR_MAX_POOL_SIZE)]
    pub executor_max_pool_size: Option<usize>,

    /// Pending background tasks before the pool grows
    #[arg(long, global = true, env = ENV_EXECUTOR_QUEUE_CAPACITY)]
    pub executor_queue_capacity: Option<usize>,
}

#[derive(Subcommand, Clone, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start the application (default command)
    Start,
    /// Apply pending database migrations and exit
    Migrate,
    /// Show the SQL a user criteria query string translates to
    Explain {
        /// Query string, e.g. "id.greaterThan=10&login.contains=adm"
        query: String,
    },
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub config: Option<PathBuf>,
    pub profiles: Option<String>,
    pub database_path: Option<PathBuf>,
    pub database_max_connections: Option<u32>,
    pub executor_core_pool_size: Option<usize>,
    pub executor_max_pool_size: Option<usize>,
    pub executor_queue_capacity: Option<usize>,
}

impl From<Cli> for (CliConfig, Option<Commands>) {
    fn from(cli: Cli) -> Self {
        let config = CliConfig {
            config: cli.config,
            profiles: cli.profiles,
            database_path: cli.database_path,
            database_max_connections: cli.database_max_connections,
            executor_core_pool_size: cli.executor_core_pool_size,
            executor_max_pool_size: cli.executor_max_pool_size,
            executor_queue_capacity: cli.executor_queue_capacity,
        };
        (config, cli.command)
    }
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Option<Commands>) {
    Cli::parse().into()
}
