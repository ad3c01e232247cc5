//! SQLite schema definitions
//!
//! Timestamps are stored as microseconds since the Unix epoch, calendar dates
//! as `YYYY-MM-DD` text, so both order correctly in SQL comparisons.

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// Initial schema SQL (version 1)
pub const SCHEMA: &str = r#"
-- =============================================================================
-- Infrastructure: Schema version tracking
-- =============================================================================
CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    version INTEGER NOT NULL,
    applied_at INTEGER NOT NULL,
    description TEXT
);

CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at INTEGER NOT NULL,
    checksum TEXT NOT NULL,
    execution_time_ms INTEGER,
    success INTEGER NOT NULL DEFAULT 1
);

-- =============================================================================
-- Users
-- =============================================================================
CREATE TABLE IF NOT EXISTS app_user (
    id INTEGER PRIMARY KEY,
    login TEXT NOT NULL UNIQUE CHECK(length(login) >= 1 AND length(login) <= 50),
    password_hash TEXT,
    first_name TEXT,
    last_name TEXT,
    email TEXT UNIQUE,
    activated INTEGER NOT NULL DEFAULT 0,
    lang_key TEXT,
    created_date INTEGER NOT NULL,
    last_modified_date INTEGER
);

CREATE INDEX IF NOT EXISTS idx_app_user_created_date ON app_user(created_date);
"#;

/// Version 2: user account lifecycle
pub const MIGRATION_V2: &str = r#"
ALTER TABLE app_user ADD COLUMN activation_key TEXT;
ALTER TABLE app_user ADD COLUMN reset_date INTEGER;
CREATE INDEX IF NOT EXISTS idx_app_user_email ON app_user(email)
"#;
