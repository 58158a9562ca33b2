//! Error types for pgmapper

use thiserror::Error;

/// Result type alias for pgmapper operations
pub type MapperResult<T> = Result<T, MapperError>;

/// Error types for templating and database operations
#[derive(Debug, Error)]
pub enum MapperError {
    /// A `{name}` placeholder (or mapped object field) has no value
    #[error("postgresql: missing parameter: {0}")]
    MissingParameter(String),

    /// The adapter has no open pool
    #[error("postgresql: not connected")]
    NotConnected,

    /// Database connection error
    #[error("postgresql: connection error: {0}")]
    Connection(String),

    /// Query execution error
    #[error("postgresql: query failed: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// A statement would exceed PostgreSQL's bind-parameter limit
    #[error("postgresql: statement needs {0} bind parameters, the limit is 65535")]
    TooManyParameters(usize),

    /// No row matched a single-row read or a mutation
    #[error("postgresql: not found: {0}")]
    NotFound(String),

    /// Unique constraint violation
    #[error("postgresql: unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("postgresql: foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("postgresql: check constraint violation: {0}")]
    CheckViolation(String),

    /// Row decode error
    #[error("postgresql: decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Pool error
    #[error("postgresql: pool error: {0}")]
    Pool(String),

    /// Invalid adapter configuration
    #[error("postgresql: invalid config: {0}")]
    Config(String),
}

impl MapperError {
    /// Create a missing parameter error
    pub fn missing(name: impl Into<String>) -> Self {
        Self::MissingParameter(name.into())
    }

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

    /// Check if this is a missing parameter error
    pub fn is_missing_parameter(&self) -> bool {
        matches!(self, Self::MissingParameter(_))
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Parse a tokio_postgres error into a more specific MapperError
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();

            match db_err.code().code() {
                "23505" => return Self::UniqueViolation(format!("{}: {}", constraint, message)),
                "23503" => {
                    return Self::ForeignKeyViolation(format!("{}: {}", constraint, message));
                }
                "23514" => return Self::CheckViolation(format!("{}: {}", constraint, message)),
                _ => {}
            }
        }
        Self::Query(err)
    }
}

impl From<deadpool_postgres::PoolError> for MapperError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}
