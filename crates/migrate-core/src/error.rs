use thiserror::Error;

/// Core error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Malformed migration '{file}': {reason}")]
    MalformedMigration { file: String, reason: String },
}

impl MigrateError {
    /// Whether this error means the invocation was missing or had bad arguments,
    /// as opposed to a failure while doing the work.
    pub fn is_config(&self) -> bool {
        matches!(self, MigrateError::Config(_))
    }
}

/// Result type alias using MigrateError.
pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_config() {
        assert!(MigrateError::Config("missing".into()).is_config());
        assert!(!MigrateError::NotFound("x.sql".into()).is_config());
    }

    #[test]
    fn test_malformed_display() {
        let err = MigrateError::MalformedMigration {
            file: "20240101000000_init.sql".into(),
            reason: "down marker appears 2 times".into(),
        };
        assert_eq!(
            err.to_string(),
            "Malformed migration '20240101000000_init.sql': down marker appears 2 times"
        );
    }
}
