//! # Cache Error Types
//!
//! Error types for local cache operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  sqlx::Error / MigrateError / serde_json::Error                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CacheError (this module) ← Adds context and categorization             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CheckoutError::Cache (storefront-checkout)                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Logged; the checkout keeps working from memory                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Local cache errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Cache file could not be opened.
    ///
    /// ## When This Occurs
    /// - Directory doesn't exist or isn't writable
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Schema migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A stored value is not valid JSON for the requested type.
    ///
    /// ## When This Occurs
    /// - An older app version wrote a different shape
    /// - The file was edited by hand
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal cache error.
    #[error("Internal cache error: {0}")]
    Internal(String),
}

/// Convert sqlx errors to CacheError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::Database       → CacheError::QueryFailed
/// sqlx::Error::PoolTimedOut   → CacheError::PoolExhausted
/// sqlx::Error::PoolClosed     → CacheError::ConnectionFailed
/// Other                       → CacheError::Internal
/// ```
impl From<sqlx::Error> for CacheError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => CacheError::QueryFailed(db_err.message().to_string()),
            sqlx::Error::PoolTimedOut => CacheError::PoolExhausted,
            sqlx::Error::PoolClosed => CacheError::ConnectionFailed("Pool is closed".to_string()),
            _ => CacheError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for CacheError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        CacheError::MigrationFailed(err.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversions() {
        let err: CacheError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, CacheError::PoolExhausted));

        let err: CacheError = sqlx::Error::PoolClosed.into();
        assert_eq!(err.to_string(), "Connection failed: Pool is closed");

        let json_err = serde_json::from_str::<i64>("not json").unwrap_err();
        let err: CacheError = json_err.into();
        assert!(matches!(err, CacheError::Serialization(_)));
    }
}
