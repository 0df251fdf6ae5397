//! Error types for framefetch.
//!
//! Errors are organized by functional area and wrapped by [`FetchError`].
//! [`FetchError::kind`] classifies any error into the coarse [`ErrorKind`]
//! taxonomy callers usually branch on.

use std::fmt;
use thiserror::Error;

/// Top-level error type encompassing all possible errors.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Connection-related errors
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Query execution errors
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Data conversion errors
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// Transport protocol errors
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Caller supplied an invalid argument
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Errors related to database connections.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// Failed to establish connection to the database
    #[error("Failed to connect to {host}:{port}: {message}")]
    ConnectionFailed {
        host: String,
        port: u16,
        message: String,
    },

    /// Authentication failure
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Invalid connection parameters
    #[error("Invalid connection parameter '{parameter}': {message}")]
    InvalidParameter { parameter: String, message: String },

    /// Connection string parsing error
    #[error("Failed to parse connection string: {0}")]
    ParseError(String),

    /// Connection is closed
    #[error("Connection is closed")]
    ConnectionClosed,
}

/// Errors related to query execution.
#[derive(Error, Debug)]
pub enum QueryError {
    /// The data source rejected the statement
    #[error("Statement rejected{}: {message}", sql_code.as_deref().map(|c| format!(" (SQL code {c})")).unwrap_or_default())]
    Rejected {
        sql_code: Option<String>,
        message: String,
    },

    /// Another statement is still active on this connection
    #[error("Connection is busy with another statement")]
    ConcurrentUse,

    /// Statement did not produce a result set
    #[error("Result set not available: {0}")]
    NoResultSet(String),

    /// Cursor was already closed
    #[error("Cursor has been closed")]
    CursorClosed,
}

/// Errors related to data type conversion.
#[derive(Error, Debug)]
pub enum ConversionError {
    /// Unsupported column type reported by the source
    #[error("Unsupported column type: {type_name}")]
    UnsupportedType { type_name: String },

    /// Failed to convert value
    #[error("Failed to convert value at row {row}, column {column}: {message}")]
    ValueConversionFailed {
        row: usize,
        column: usize,
        message: String,
    },

    /// Schema mismatch
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Overflow during conversion
    #[error("Numeric overflow at row {row}, column {column}")]
    NumericOverflow { row: usize, column: usize },

    /// Arrow error
    #[error("Arrow error: {0}")]
    ArrowError(String),
}

/// Errors related to the transport protocol.
#[derive(Error, Debug)]
pub enum TransportError {
    /// WebSocket connection error
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Message serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Protocol error
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// Invalid response from server
    #[error("Invalid server response: {0}")]
    InvalidResponse(String),

    /// Network I/O error
    #[error("Network I/O error: {0}")]
    IoError(String),

    /// Message send error
    #[error("Failed to send message: {0}")]
    SendError(String),

    /// Message receive error
    #[error("Failed to receive message: {0}")]
    ReceiveError(String),

    /// Server answered with an exception for the request
    #[error("Server rejected request{}: {message}", sql_code.as_deref().map(|c| format!(" (SQL code {c})")).unwrap_or_default())]
    Rejected {
        sql_code: Option<String>,
        message: String,
    },
}

/// Invalid caller input, detected before any network interaction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A size parameter was zero or negative
    #[error("'{parameter}' must be a positive integer, got {value}")]
    NonPositiveSize { parameter: &'static str, value: i64 },

    /// A bind parameter cannot be represented on the wire
    #[error("Bind parameter {index} is invalid: {message}")]
    InvalidParameter { index: usize, message: String },
}

/// Coarse error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Transport or authentication failure
    Connectivity,
    /// Statement invalid or rejected by the source
    QueryExecution,
    /// One connection used by two logical operations at once
    ConcurrentUse,
    /// Non-positive size hints and other bad arguments
    InputValidation,
    /// Result data could not be represented as Arrow
    Conversion,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Connectivity => write!(f, "CONNECTIVITY"),
            ErrorKind::QueryExecution => write!(f, "QUERY_EXECUTION"),
            ErrorKind::ConcurrentUse => write!(f, "CONCURRENT_USE"),
            ErrorKind::InputValidation => write!(f, "INPUT_VALIDATION"),
            ErrorKind::Conversion => write!(f, "CONVERSION"),
        }
    }
}

impl FetchError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Connection(e) => e.kind(),
            FetchError::Query(e) => e.kind(),
            FetchError::Conversion(_) => ErrorKind::Conversion,
            FetchError::Transport(e) => e.kind(),
            FetchError::Validation(_) => ErrorKind::InputValidation,
        }
    }
}

impl ConnectionError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConnectionError::InvalidParameter { .. } | ConnectionError::ParseError(_) => {
                ErrorKind::InputValidation
            }
            _ => ErrorKind::Connectivity,
        }
    }
}

impl QueryError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueryError::ConcurrentUse => ErrorKind::ConcurrentUse,
            _ => ErrorKind::QueryExecution,
        }
    }
}

impl TransportError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransportError::Rejected { .. } => ErrorKind::QueryExecution,
            _ => ErrorKind::Connectivity,
        }
    }
}

// Conversions from external error types
impl From<arrow::error::ArrowError> for ConversionError {
    fn from(err: arrow::error::ArrowError) -> Self {
        ConversionError::ArrowError(err.to_string())
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::SerializationError(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        TransportError::WebSocketError(err.to_string())
    }
}
