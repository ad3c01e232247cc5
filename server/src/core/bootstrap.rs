//! Startup migration strategy
//!
//! The mode is resolved once from the active profiles. Fast-startup profiles
//! hand the migration to the background executor so the process can come up
//! before the schema is ready.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::oneshot;

use super::config::Profiles;
use super::constants::{FAST_STARTUP_PROFILES, PROFILE_NO_MIGRATIONS};
use super::executor::TaskExecutor;
use crate::data::migration::{MigrationError, Migrator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationMode {
    Disabled,
    Synchronous,
    Asynchronous,
}

impl MigrationMode {
    /// `no-migrations` wins over any fast-startup profile
    pub fn from_profiles(profiles: &Profiles) -> Self {
        if profiles.is_active(PROFILE_NO_MIGRATIONS) {
            Self::Disabled
        } else if FAST_STARTUP_PROFILES.iter().any(|p| profiles.is_active(p)) {
            Self::Asynchronous
        } else {
            Self::Synchronous
        }
    }
}

impl std::fmt::Display for MigrationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Disabled => "disabled",
            Self::Synchronous => "synchronous",
            Self::Asynchronous => "asynchronous",
        };
        f.write_str(name)
    }
}

pub type MigrationReceiver = oneshot::Receiver<Result<Duration, MigrationError>>;

#[derive(Debug)]
pub enum MigrationOutcome {
    Skipped,
    Completed(Duration),
    /// Running in the background; resolves when the migration finishes
    Scheduled(MigrationReceiver),
}

pub struct MigrationBootstrap {
    mode: MigrationMode,
    slow_threshold: Duration,
}

impl MigrationBootstrap {
    pub fn new(mode: MigrationMode, slow_threshold: Duration) -> Self {
        Self {
            mode,
            slow_threshold,
        }
    }

    pub fn mode(&self) -> MigrationMode {
        self.mode
    }

    /// Run, schedule or skip the migration according to the mode
    ///
    /// Only the synchronous mode reports migration failures to the caller.
    pub async fn start(
        &self,
        migrator: Arc<dyn Migrator>,
        executor: &TaskExecutor,
    ) -> Result<MigrationOutcome, MigrationError> {
        match self.mode {
            MigrationMode::Disabled => {
                tracing::debug!("Database migrations disabled");
                Ok(MigrationOutcome::Skipped)
            }
            MigrationMode::Synchronous => {
                tracing::debug!("Running database migrations synchronously");
                let elapsed = timed_run(migrator.as_ref(), self.slow_threshold).await?;
                Ok(MigrationOutcome::Completed(elapsed))
            }
            MigrationMode::Asynchronous => {
                tracing::warn!(
                    "Starting database migrations asynchronously, the database might not be ready at startup"
                );
                let (tx, rx) = oneshot::channel();
                let slow_threshold = self.slow_threshold;
                executor.submit(async move {
                    let result = timed_run(migrator.as_ref(), slow_threshold).await;
                    if let Err(e) = &result {
                        tracing::error!(error = %e, "Asynchronous database migration failed");
                    }
                    // Receiver may have been dropped; the outcome is already logged
                    let _ = tx.send(result);
                    Ok(())
                })?;
                Ok(MigrationOutcome::Scheduled(rx))
            }
        }
    }
}

async fn timed_run(
    migrator: &dyn Migrator,
    slow_threshold: Duration,
) -> Result<Duration, MigrationError> {
    let start = Instant::now();
    migrator.run_migrations().await?;
    let elapsed = start.elapsed();

    if elapsed > slow_threshold {
        tracing::warn!(
            elapsed_ms = elapsed.as_millis() as u64,
            threshold_ms = slow_threshold.as_millis() as u64,
            "Database migrations were slow to complete"
        );
    } else {
        tracing::debug!(
            elapsed_ms = elapsed.as_millis() as u64,
            "Database migrations completed"
        );
    }
    Ok(elapsed)
}
