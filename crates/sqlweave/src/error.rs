//! Error types for sqlweave

use thiserror::Error;

/// Result type alias for sqlweave operations
pub type SqlResult<T> = Result<T, SqlError>;

/// Errors surfaced while executing a built statement.
///
/// Building and rendering a statement never returns an error: misuse of the
/// builder (out-of-range positions, `set` without INSERT/UPDATE, ...) panics
/// instead, since it is a bug in the calling code rather than a runtime
/// condition.
#[derive(Debug, Error)]
pub enum SqlError {
    /// Error reported by `tokio-postgres`
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// A single-row query returned no rows
    #[error("Not found: {0}")]
    NotFound(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),

    /// Error reported by a custom executor
    #[error("{0}")]
    Other(String),
}

impl SqlError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for SqlError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}
