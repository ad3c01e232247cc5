//! Core application

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::core::bootstrap::{MigrationBootstrap, MigrationMode, MigrationOutcome};
use crate::core::cli::{self, CliConfig, Commands};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME, APP_NAME_LOWER, ENV_LOG};
use crate::core::executor::TaskExecutor;
use crate::core::shutdown::ShutdownService;
use crate::data::filters::{SqlParams, Value, build_predicate, parse_criteria};
use crate::data::sqlite::SqliteService;
use crate::domain::users;

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub database: Arc<SqliteService>,
    pub executor: TaskExecutor,
}

/// A user query string rendered to SQL
#[derive(Debug, Clone, PartialEq)]
pub struct Explanation {
    pub where_clause: String,
    pub params: Vec<Value>,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        match command {
            Some(Commands::Migrate) => Self::migrate(&cli_config).await,
            Some(Commands::Explain { query }) => Self::print_explanation(&query),
            Some(Commands::Start) | None => {
                let app = Self::init(&cli_config).await?;
                app.start().await
            }
        }
    }

    async fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;
        let database = Arc::new(
            SqliteService::init(&config.database)
                .await
                .context("Failed to initialize database")?,
        );
        let executor = TaskExecutor::new(config.executor.clone())
            .context("Failed to start task executor")?;
        let shutdown = ShutdownService::new(executor.clone(), database.clone());

        Ok(Self {
            shutdown,
            config,
            database,
            executor,
        })
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start(self) -> Result<()> {
        // Signal handlers go in before migrations so a slow migration can be interrupted
        self.shutdown.install_signal_handlers();

        let mode = MigrationMode::from_profiles(&self.config.profiles);
        tracing::debug!(profiles = %self.config.profiles, %mode, "Resolved migration mode");

        let bootstrap = MigrationBootstrap::new(mode, self.config.migration.slow_threshold);
        let outcome = bootstrap
            .start(Arc::new(self.database.migrator()), &self.executor)
            .await;

        match outcome {
            Ok(MigrationOutcome::Scheduled(rx)) => {
                tokio::spawn(async move {
                    if let Ok(Ok(elapsed)) = rx.await {
                        tracing::info!(
                            elapsed_ms = elapsed.as_millis() as u64,
                            "Database ready"
                        );
                    }
                });
            }
            Ok(MigrationOutcome::Completed(_)) | Ok(MigrationOutcome::Skipped) => {}
            Err(e) => {
                self.shutdown.shutdown().await;
                return Err(e).context("Database migration failed");
            }
        }

        tracing::info!(
            profiles = %self.config.profiles,
            database = %self.config.database.path.display(),
            "{} started",
            APP_NAME
        );

        self.shutdown.wait().await;
        self.shutdown.shutdown().await;
        Ok(())
    }

    /// Apply migrations in the foreground regardless of active profiles
    async fn migrate(cli: &CliConfig) -> Result<()> {
        let app = Self::init(cli).await?;
        let bootstrap = MigrationBootstrap::new(
            MigrationMode::Synchronous,
            app.config.migration.slow_threshold,
        );
        let result = bootstrap
            .start(Arc::new(app.database.migrator()), &app.executor)
            .await;
        app.shutdown.shutdown().await;

        if let MigrationOutcome::Completed(elapsed) = result.context("Database migration failed")? {
            println!(
                "Migrations applied to {} in {} ms",
                app.config.database.path.display(),
                elapsed.as_millis()
            );
        }
        Ok(())
    }

    fn print_explanation(query: &str) -> Result<()> {
        let explanation = explain(query)?;
        println!("WHERE {}", explanation.where_clause);
        for (i, value) in explanation.params.iter().enumerate() {
            println!("  ?{} = {}", i + 1, value);
        }
        Ok(())
    }
}

/// Decode a user query string and render its SQL `WHERE` fragment
pub fn explain(query: &str) -> Result<Explanation> {
    let schema = users::schema().context("Invalid user schema")?;
    let criteria = parse_criteria(&schema, query)?;
    tracing::debug!(%criteria, "Decoded user criteria");

    let mut params = SqlParams::default();
    let where_clause = build_predicate(&criteria).to_sql(&mut params);
    Ok(Explanation {
        where_clause,
        params: params.values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filters::FilterError;

    #[test]
    fn test_explain_renders_conjunction() {
        let explanation = explain("login.contains=adm&id.greaterThan=1").unwrap();
        assert_eq!(
            explanation.where_clause,
            "id > ? AND UPPER(login) LIKE ? ESCAPE '\\'"
        );
        assert_eq!(
            explanation.params,
            vec![Value::Integer(1), Value::Text("%ADM%".to_string())]
        );
    }

    #[test]
    fn test_explain_empty_query_matches_all() {
        let explanation = explain("").unwrap();
        assert!(explanation.params.is_empty());
        assert_eq!(explanation.where_clause, "1=1");
    }

    #[test]
    fn test_explain_rejects_unknown_attribute() {
        let err = explain("password.equals=x").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FilterError>(),
            Some(FilterError::UnknownAttribute(_))
        ));
    }
}
