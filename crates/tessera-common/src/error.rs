//! Error types for tessera

use thiserror::Error;

/// Result type alias for tessera operations
pub type Result<T> = std::result::Result<T, TesseraError>;

/// Unified error type for compiling, encoding, decoding and executing queries
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TesseraError {
    /// The operator has no SQL translation for the column's field kind.
    #[error("Operator '{operator}' is not supported for {kind} field '{field}' with {shape} value")]
    UnsupportedOperatorForType {
        field: String,
        operator: String,
        kind: String,
        shape: &'static str,
    },

    /// IN / NOT IN requested with a zero-length list.
    #[error("Empty array given for IN condition on field '{field}'")]
    EmptyArrayCondition { field: String },

    /// A decoded number does not fit the exactly representable integer range.
    #[error("Number '{0}' exceeds the exact integer range of a double")]
    NumericPrecision(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Invalid ORDER BY: {0}")]
    InvalidOrderBy(String),

    #[error("Invalid LIMIT/OFFSET: {0}")]
    InvalidLimitOffset(String),

    #[error("Invalid condition key '{0}'")]
    InvalidConditionKey(String),

    #[error("Invalid condition: {0}")]
    InvalidCondition(String),

    /// Raised by callers that reject undefined values before compiling.
    #[error("Undefined value for condition key '{key}'")]
    UndefinedValue { key: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    /// Unique or exclusion constraint violation (SQLSTATE 23505, 23P01)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Connection pool timeout - retryable
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Deadlock or serialization failure that may succeed on retry
    #[error("Transient error: {0}")]
    Transient(String),
}

impl TesseraError {
    /// Returns true if this error is potentially retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, TesseraError::Timeout(_) | TesseraError::Transient(_))
    }

    /// Returns true if the error was raised while compiling a statement,
    /// before anything reached the database.
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            TesseraError::UnsupportedOperatorForType { .. }
                | TesseraError::EmptyArrayCondition { .. }
                | TesseraError::InvalidIdentifier(_)
                | TesseraError::InvalidOrderBy(_)
                | TesseraError::InvalidLimitOffset(_)
                | TesseraError::InvalidConditionKey(_)
                | TesseraError::InvalidCondition(_)
                | TesseraError::UndefinedValue { .. }
                | TesseraError::InvalidValue(_)
                | TesseraError::Query(_)
        )
    }
}

impl From<serde_json::Error> for TesseraError {
    fn from(err: serde_json::Error) -> Self {
        TesseraError::Serialization(err.to_string())
    }
}

// PostgreSQL-specific error conversions (when postgres-errors feature is enabled)
#[cfg(feature = "postgres-errors")]
impl From<sqlx::Error> for TesseraError {
    fn from(err: sqlx::Error) -> Self {
        use sqlx::Error;
        match &err {
            Error::Configuration(_) => TesseraError::Connection(err.to_string()),
            Error::Database(db_err) => {
                // See: https://www.postgresql.org/docs/current/errcodes-appendix.html
                if let Some(code) = db_err.code() {
                    let code_str: &str = &code;
                    match code_str {
                        "23505" | "23P01" => return TesseraError::Conflict(err.to_string()),
                        "40P01" | "40001" => return TesseraError::Transient(err.to_string()),
                        code if code.starts_with("40") => {
                            return TesseraError::Transient(err.to_string())
                        }
                        code if code.starts_with("08") => {
                            return TesseraError::Connection(err.to_string())
                        }
                        "57P01" | "57P02" | "57P03" => {
                            return TesseraError::Transient(err.to_string())
                        }
                        _ => {}
                    }
                }
                TesseraError::Database(err.to_string())
            }
            Error::Io(_) | Error::Tls(_) | Error::Protocol(_) => {
                TesseraError::Connection(err.to_string())
            }
            Error::ColumnDecode { .. } | Error::Decode(_) | Error::TypeNotFound { .. } => {
                TesseraError::Decode(err.to_string())
            }
            Error::PoolTimedOut => TesseraError::Timeout("Connection pool timed out".to_string()),
            Error::PoolClosed => TesseraError::Connection("Connection pool closed".to_string()),
            _ => TesseraError::Database(err.to_string()),
        }
    }
}
