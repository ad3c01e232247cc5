use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_EXECUTOR_CORE_POOL_SIZE,
    DEFAULT_EXECUTOR_KEEP_ALIVE_SECS, DEFAULT_EXECUTOR_MAX_POOL_SIZE,
    DEFAULT_EXECUTOR_QUEUE_CAPACITY, DEFAULT_MIGRATION_SLOW_THRESHOLD_MS, DEFAULT_PROFILE,
    EXECUTOR_THREAD_PREFIX, KNOWN_PROFILES, PROFILE_CLOUD, PROFILE_DEVELOPMENT,
    PROFILE_PRODUCTION, SQLITE_DB_FILENAME, SQLITE_MAX_CONNECTIONS,
};
use super::executor::ExecutorConfig;

// =============================================================================
// Profiles
// =============================================================================

/// Ordered, de-duplicated set of active profile names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profiles(Vec<String>);

impl Profiles {
    /// Parse a comma-separated list; blanks are dropped, names lowercased
    pub fn parse(list: &str) -> Self {
        Self::from_names(list.split(','))
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut profiles: Vec<String> = Vec::new();
        for name in names {
            let name = name.as_ref().trim().to_lowercase();
            if !name.is_empty() && !profiles.contains(&name) {
                profiles.push(name);
            }
        }
        Self(profiles)
    }

    pub fn is_active(&self, profile: &str) -> bool {
        self.0.iter().any(|p| p == profile)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for Profiles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(","))
    }
}

// =============================================================================
// File Config
// =============================================================================

/// Database configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct DatabaseFileConfig {
    pub path: Option<PathBuf>,
    pub max_connections: Option<u32>,
}

/// Executor configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ExecutorFileConfig {
    pub core_pool_size: Option<usize>,
    pub max_pool_size: Option<usize>,
    pub queue_capacity: Option<usize>,
    pub keep_alive_secs: Option<u64>,
}

/// Migration configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct MigrationFileConfig {
    pub slow_threshold_ms: Option<u64>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub profiles: Option<Vec<String>>,
    pub database: Option<DatabaseFileConfig>,
    pub executor: Option<ExecutorFileConfig>,
    pub migration: Option<MigrationFileConfig>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Unknown top-level keys
    fn unknown_fields(&self) -> Vec<&str> {
        match &self.extra {
            serde_json::Value::Object(map) => map.keys().map(|k| k.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        let unknown = self.unknown_fields();
        if !unknown.is_empty() {
            tracing::warn!(
                fields = %unknown.join(", "),
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        if other.profiles.is_some() {
            tracing::trace!(profiles = ?other.profiles, "Merging profiles");
            self.profiles = other.profiles;
        }

        if let Some(database) = other.database {
            let current = self.database.get_or_insert_with(DatabaseFileConfig::default);
            if database.path.is_some() {
                tracing::trace!(path = ?database.path, "Merging database.path");
                current.path = database.path;
            }
            if database.max_connections.is_some() {
                current.max_connections = database.max_connections;
            }
        }

        if let Some(executor) = other.executor {
            let current = self.executor.get_or_insert_with(ExecutorFileConfig::default);
            if executor.core_pool_size.is_some() {
                current.core_pool_size = executor.core_pool_size;
            }
            if executor.max_pool_size.is_some() {
                current.max_pool_size = executor.max_pool_size;
            }
            if executor.queue_capacity.is_some() {
                current.queue_capacity = executor.queue_capacity;
            }
            if executor.keep_alive_secs.is_some() {
                current.keep_alive_secs = executor.keep_alive_secs;
            }
        }

        if let Some(migration) = other.migration {
            let current = self.migration.get_or_insert_with(MigrationFileConfig::default);
            if migration.slow_threshold_ms.is_some() {
                current.slow_threshold_ms = migration.slow_threshold_ms;
            }
        }
    }
}

// =============================================================================
// Resolved Config
// =============================================================================

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct MigrationConfig {
    pub slow_threshold: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub profiles: Profiles,
    pub database: DatabaseConfig,
    pub executor: ExecutorConfig,
    pub migration: MigrationConfig,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.mimiron/mimiron.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        // 1. Profile dir, skipped if absent
        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        // 2. CLI-specified path OR local directory
        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_home(path);
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        Self::resolve(cli, file_config)
    }

    /// Layer defaults, file config and CLI/env overrides
    fn resolve(cli: &CliConfig, file_config: FileConfig) -> Result<Self> {
        let file_database = file_config.database.unwrap_or_default();
        let file_executor = file_config.executor.unwrap_or_default();
        let file_migration = file_config.migration.unwrap_or_default();

        let mut profiles = match (&cli.profiles, file_config.profiles) {
            (Some(list), _) => Profiles::parse(list),
            (None, Some(names)) => Profiles::from_names(names),
            (None, None) => Profiles::default(),
        };
        if profiles.is_empty() {
            tracing::debug!(profile = DEFAULT_PROFILE, "No profile configured, using default");
            profiles = Profiles::parse(DEFAULT_PROFILE);
        }

        let database = DatabaseConfig {
            path: cli
                .database_path
                .clone()
                .or(file_database.path)
                .map(|p| expand_home(&p))
                .unwrap_or_else(default_database_path),
            max_connections: cli
                .database_max_connections
                .or(file_database.max_connections)
                .unwrap_or(SQLITE_MAX_CONNECTIONS),
        };

        let executor = ExecutorConfig {
            core_pool_size: cli
                .executor_core_pool_size
                .or(file_executor.core_pool_size)
                .unwrap_or(DEFAULT_EXECUTOR_CORE_POOL_SIZE),
            max_pool_size: cli
                .executor_max_pool_size
                .or(file_executor.max_pool_size)
                .unwrap_or(DEFAULT_EXECUTOR_MAX_POOL_SIZE),
            queue_capacity: cli
                .executor_queue_capacity
                .or(file_executor.queue_capacity)
                .unwrap_or(DEFAULT_EXECUTOR_QUEUE_CAPACITY),
            keep_alive: Duration::from_secs(
                file_executor
                    .keep_alive_secs
                    .unwrap_or(DEFAULT_EXECUTOR_KEEP_ALIVE_SECS),
            ),
            thread_prefix: EXECUTOR_THREAD_PREFIX.to_string(),
        };

        let migration = MigrationConfig {
            slow_threshold: Duration::from_millis(
                file_migration
                    .slow_threshold_ms
                    .unwrap_or(DEFAULT_MIGRATION_SLOW_THRESHOLD_MS),
            ),
        };

        let config = Self {
            profiles,
            database,
            executor,
            migration,
        };
        config.validate()?;

        tracing::debug!(
            profiles = %config.profiles,
            database = %config.database.path.display(),
            "Configuration loaded"
        );
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.database.max_connections == 0 {
            anyhow::bail!("database.max_connections must be at least 1");
        }

        for name in self.profiles.names() {
            if !KNOWN_PROFILES.contains(&name.as_str()) {
                tracing::warn!(profile = %name, "Unknown profile");
            }
        }

        if self.profiles.is_active(PROFILE_DEVELOPMENT) {
            for conflicting in [PROFILE_PRODUCTION, PROFILE_CLOUD] {
                if self.profiles.is_active(conflicting) {
                    tracing::error!(
                        "Misconfigured profiles: '{}' and '{}' should not be active at the same time",
                        PROFILE_DEVELOPMENT,
                        conflicting
                    );
                }
            }
        }

        Ok(())
    }
}

/// Get the profile config path (~/.mimiron/mimiron.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}

/// ~/.mimiron/mimiron.db, or the working directory without a home
fn default_database_path() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(APP_DOT_FOLDER).join(SQLITE_DB_FILENAME))
        .unwrap_or_else(|| PathBuf::from(SQLITE_DB_FILENAME))
}

/// Expand a leading `~` to the home directory
fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}
