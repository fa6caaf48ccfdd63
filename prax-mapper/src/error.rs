//! Error types for mapping, hydration and storage operations.
//!
//! Errors carry a stable code for programmatic handling plus context about
//! the entity type, field and SQL involved.
//!
//! # Error Codes
//!
//! Error codes follow a pattern: P{category}{number}
//! - 1xxx: Lookup errors (record or entity type not found)
//! - 2xxx: Mapping errors (unknown field, invalid association)
//! - 3xxx: Connection errors
//! - 5xxx: Execution errors
//! - 6xxx: Data errors (identifier conversion)
//! - 9xxx: Internal errors
//!
//! ```rust
//! use prax_mapper::{ErrorCode, MapperError};
//!
//! let err = MapperError::unknown_entity("Article");
//! assert_eq!(err.code, ErrorCode::UnknownEntity);
//! assert!(err.to_string().starts_with("[P1002]"));
//! ```

use std::fmt;
use thiserror::Error;

/// Result type for mapper operations.
pub type MapperResult<T> = Result<T, MapperError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Lookup errors (1xxx)
    /// Record not found (P1001).
    RecordNotFound = 1001,
    /// Entity type is not registered in the catalog (P1002).
    UnknownEntity = 1002,

    // Mapping errors (2xxx)
    /// Field or association is not mapped on the entity (P2001).
    UnknownField = 2001,
    /// Association or entity metadata is inconsistent (P2002).
    InvalidMapping = 2002,

    // Connection errors (3xxx)
    /// Storage backend unavailable (P3001).
    ConnectionFailed = 3001,

    // Execution errors (5xxx)
    /// Query could not be executed (P5001).
    QueryFailed = 5001,
    /// General database error (P5005).
    DatabaseError = 5005,

    // Data errors (6xxx)
    /// Value does not match the declared identifier type (P6001).
    InvalidDataType = 6001,

    // Internal errors (9xxx)
    /// Internal error (P9001).
    Internal = 9001,
}

impl ErrorCode {
    /// Get the error code string (e.g., "P1001").
    pub fn code(&self) -> String {
        format!("P{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::RecordNotFound => "Record not found",
            Self::UnknownEntity => "Unknown entity type",
            Self::UnknownField => "Unknown field",
            Self::InvalidMapping => "Invalid mapping",
            Self::ConnectionFailed => "Storage connection failed",
            Self::QueryFailed => "Query failed",
            Self::DatabaseError => "Database error",
            Self::InvalidDataType => "Invalid data type",
            Self::Internal => "Internal error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Additional context for an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The entity type involved.
    pub model: Option<String>,
    /// The field involved.
    pub field: Option<String>,
    /// The SQL query (if available).
    pub sql: Option<String>,
    /// Help text.
    pub help: Option<String>,
}

/// Errors raised by the mapper and its storage backends.
#[derive(Error, Debug)]
pub struct MapperError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// The source error (if any).
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for MapperError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl MapperError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Set the entity type.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.context.model = Some(model.into());
        self
    }

    /// Set the field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.context.field = Some(field.into());
        self
    }

    /// Set the SQL query.
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.context.sql = Some(sql.into());
        self
    }

    /// Add help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.context.help = Some(help.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // ============== Constructor Functions ==============

    /// Create a not found error.
    pub fn not_found(model: impl Into<String>, id: impl fmt::Display) -> Self {
        let model = model.into();
        Self::new(
            ErrorCode::RecordNotFound,
            format!("No {} record found with identifier {}", model, id),
        )
        .with_model(model)
    }

    /// Create an unknown entity type error.
    pub fn unknown_entity(model: impl Into<String>) -> Self {
        let model = model.into();
        Self::new(
            ErrorCode::UnknownEntity,
            format!("Entity type `{}` is not registered in the schema", model),
        )
        .with_model(model)
        .with_help("Register the entity with Schema::builder().entity(...) before using it")
    }

    /// Create an unknown field error.
    pub fn unknown_field(model: impl Into<String>, field: impl Into<String>) -> Self {
        let model = model.into();
        let field = field.into();
        Self::new(
            ErrorCode::UnknownField,
            format!("`{}.{}` is not a mapped field or association", model, field),
        )
        .with_model(model)
        .with_field(field)
    }

    /// Create an invalid mapping error.
    pub fn invalid_mapping(model: impl Into<String>, message: impl Into<String>) -> Self {
        let model = model.into();
        let message = message.into();
        Self::new(
            ErrorCode::InvalidMapping,
            format!("Invalid mapping for `{}`: {}", model, message),
        )
        .with_model(model)
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::ConnectionFailed, format!("Connection error: {}", message))
    }

    /// Create a query execution error.
    pub fn query_failed(message: impl Into<String>, sql: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::QueryFailed, format!("Query failed: {}", message)).with_sql(sql)
    }

    /// Create a general database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message.into())
    }

    /// Create an invalid data type error.
    pub fn invalid_data_type(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidDataType, message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::Internal, format!("Internal error: {}", message))
    }

    // ============== Error Checks ==============

    /// Check if this is a not found error.
    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::RecordNotFound
    }

    /// Check if this error originates from the mapping configuration.
    pub fn is_mapping_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::UnknownEntity | ErrorCode::UnknownField | ErrorCode::InvalidMapping
        )
    }

    /// Check if this is a connection error.
    pub fn is_connection_error(&self) -> bool {
        self.code == ErrorCode::ConnectionFailed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_format() {
        assert_eq!(ErrorCode::RecordNotFound.code(), "P1001");
        assert_eq!(ErrorCode::InvalidMapping.code(), "P2002");
        assert_eq!(ErrorCode::Internal.to_string(), "P9001");
    }

    #[test]
    fn test_unknown_field_error() {
        let err = MapperError::unknown_field("Article", "author");
        assert_eq!(err.code, ErrorCode::UnknownField);
        assert_eq!(err.context.model.as_deref(), Some("Article"));
        assert_eq!(err.context.field.as_deref(), Some("author"));
        assert!(err.is_mapping_error());
        assert!(err.to_string().contains("Article.author"));
    }

    #[test]
    fn test_query_failed_keeps_sql() {
        let err = MapperError::query_failed("backend went away", "SELECT * FROM tag t0");
        assert_eq!(err.context.sql.as_deref(), Some("SELECT * FROM tag t0"));
        assert!(!err.is_mapping_error());
    }

    #[test]
    fn test_connection_error() {
        let err = MapperError::connection("refused");
        assert!(err.is_connection_error());
        assert_eq!(err.to_string(), "[P3001] Connection error: refused");
    }
}
