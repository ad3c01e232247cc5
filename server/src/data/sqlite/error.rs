//! SQLite error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SqliteError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only volume");
        let sqlite_err: SqliteError = io_err.into();
        assert_eq!(sqlite_err.to_string(), "IO error: read-only volume");
    }

    #[test]
    fn test_database_error_from() {
        let err: SqliteError = sqlx::Error::RowNotFound.into();
        assert!(err.to_string().starts_with("Database error:"));
        assert!(format!("{:?}", err).contains("RowNotFound"));
    }
}
