//! Unified error type for the data layer.
//!
//! Wraps backend-specific errors (currently just PostgreSQL) while keeping a
//! single error type the domain layer can match on regardless of which
//! database backend is configured.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    /// PostgreSQL database error
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// Migration failed
    #[error("Migration {version} ({name}) failed on {backend}: {error}")]
    MigrationFailed {
        backend: &'static str,
        version: i32,
        name: String,
        error: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Query timeout
    #[error("Query timeout after {timeout_secs}s on {backend}")]
    Timeout {
        backend: &'static str,
        timeout_secs: u64,
    },

    /// Connection pool exhausted
    #[error("Connection pool exhausted on {backend}")]
    PoolExhausted { backend: &'static str },

    /// Backend not available
    #[error("Backend {backend} is not available: {reason}")]
    BackendUnavailable {
        backend: &'static str,
        reason: String,
    },

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict error (duplicate entry, version mismatch)
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl DataError {
    pub fn migration_failed(backend: &'static str, version: i32, name: &str, error: &str) -> Self {
        Self::MigrationFailed {
            backend,
            version,
            name: name.to_string(),
            error: error.to_string(),
        }
    }

    pub fn timeout(backend: &'static str, timeout_secs: u64) -> Self {
        Self::Timeout {
            backend,
            timeout_secs,
        }
    }

    pub fn pool_exhausted(backend: &'static str) -> Self {
        Self::PoolExhausted { backend }
    }

    pub fn backend_unavailable(backend: &'static str, reason: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            backend,
            reason: reason.into(),
        }
    }

    /// Whether retrying the operation might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::PoolExhausted { .. } => true,
            Self::Postgres(e) => {
                matches!(
                    e,
                    sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
                )
            }
            _ => false,
        }
    }

    pub fn backend(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::MigrationFailed { backend, .. } => backend,
            Self::Timeout { backend, .. } => backend,
            Self::PoolExhausted { backend } => backend,
            Self::BackendUnavailable { backend, .. } => backend,
            Self::Config(_) | Self::Io(_) | Self::NotFound(_) | Self::Conflict(_) => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_failed_error_display() {
        let err = DataError::migration_failed("postgres", 2, "add_rooms_table", "syntax error");
        assert_eq!(
            err.to_string(),
            "Migration 2 (add_rooms_table) failed on postgres: syntax error"
        );
    }

    #[test]
    fn test_timeout_error_display() {
        let err = DataError::timeout("postgres", 30);
        assert_eq!(err.to_string(), "Query timeout after 30s on postgres");
    }

    #[test]
    fn test_backend_method() {
        assert_eq!(DataError::timeout("postgres", 30).backend(), "postgres");
        assert_eq!(
            DataError::pool_exhausted("postgres").backend(),
            "postgres"
        );
    }

    #[test]
    fn test_is_transient() {
        assert!(DataError::timeout("postgres", 30).is_transient());
        assert!(DataError::pool_exhausted("postgres").is_transient());
        assert!(!DataError::Config("bad config".into()).is_transient());
    }
}
