// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display)
pub const APP_NAME: &str = "Mimiron";

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "mimiron";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".mimiron";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "mimiron.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "MIMIRON_CONFIG";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "MIMIRON_LOG";

// =============================================================================
// Profiles
// =============================================================================

/// Environment variable for the comma-separated list of active profiles
pub const ENV_PROFILES: &str = "MIMIRON_PROFILES";

pub const PROFILE_DEVELOPMENT: &str = "dev";
pub const PROFILE_TEST: &str = "test";
pub const PROFILE_PRODUCTION: &str = "prod";
pub const PROFILE_CLOUD: &str = "cloud";
pub const PROFILE_HEROKU: &str = "heroku";
pub const PROFILE_SWAGGER: &str = "swagger";
pub const PROFILE_K8S: &str = "k8s";
pub const PROFILE_NO_MIGRATIONS: &str = "no-migrations";

/// Every profile name the application understands
pub const KNOWN_PROFILES: &[&str] = &[
    PROFILE_DEVELOPMENT,
    PROFILE_TEST,
    PROFILE_PRODUCTION,
    PROFILE_CLOUD,
    PROFILE_HEROKU,
    PROFILE_SWAGGER,
    PROFILE_K8S,
    PROFILE_NO_MIGRATIONS,
];

/// Profiles that trade a possibly unready database for a faster startup
pub const FAST_STARTUP_PROFILES: &[&str] = &[PROFILE_DEVELOPMENT, PROFILE_HEROKU];

/// Active when nothing is configured
pub const DEFAULT_PROFILE: &str = PROFILE_DEVELOPMENT;

// =============================================================================
// Database (SQLite)
// =============================================================================

/// Environment variable for the database file path
pub const ENV_DATABASE_PATH: &str = "MIMIRON_DATABASE_PATH";

/// Environment variable for the connection pool size
pub const ENV_DATABASE_MAX_CONNECTIONS: &str = "MIMIRON_DATABASE_MAX_CONNECTIONS";

/// Database filename inside the data directory
pub const SQLITE_DB_FILENAME: &str = "mimiron.db";

/// Default connection pool size
pub const SQLITE_MAX_CONNECTIONS: u32 = 5;

/// Busy timeout for lock contention
pub const SQLITE_BUSY_TIMEOUT_SECS: u64 = 30;

/// Page cache size (negative = KiB)
pub const SQLITE_CACHE_SIZE: &str = "-64000";

// =============================================================================
// Migrations
// =============================================================================

/// Migration runs slower than this are logged as warnings
pub const DEFAULT_MIGRATION_SLOW_THRESHOLD_MS: u64 = 5000;

// =============================================================================
// Task Executor
// =============================================================================

pub const ENV_EXECUTOR_CORE_POOL_SIZE: &str = "MIMIRON_EXECUTOR_CORE_POOL_SIZE";
pub const ENV_EXECUTOR_MAX_POOL_SIZE: &str = "MIMIRON_EXECUTOR_MAX_POOL_SIZE";
pub const ENV_EXECUTOR_QUEUE_CAPACITY: &str = "MIMIRON_EXECUTOR_QUEUE_CAPACITY";

/// Workers kept alive while idle
pub const DEFAULT_EXECUTOR_CORE_POOL_SIZE: usize = 2;

/// Upper bound on workers when the queue is full
pub const DEFAULT_EXECUTOR_MAX_POOL_SIZE: usize = 50;

/// Pending tasks before the pool grows
pub const DEFAULT_EXECUTOR_QUEUE_CAPACITY: usize = 10_000;

/// Idle time before a surplus worker retires
pub const DEFAULT_EXECUTOR_KEEP_ALIVE_SECS: u64 = 60;

/// Worker name prefix, suffixed with `-<n>`
pub const EXECUTOR_THREAD_PREFIX: &str = "mimiron-executor";

// =============================================================================
// Shutdown
// =============================================================================

/// Timeout for graceful shutdown (seconds)
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 30;
