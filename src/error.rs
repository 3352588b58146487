//! Error types for rdbc-bridge
//!
//! Provides granular error classification across the bridge's phases:
//! - Configuration errors surface before any connection opens
//! - Mapping errors surface at schema-derivation time, never at row-decode time
//! - Serialization and write errors are fatal for the owning worker

use std::fmt;
use thiserror::Error;

/// Result type for rdbc-bridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Missing or contradictory configuration (fails before any connection opens)
    Configuration,
    /// Driver load/registration/connect failure
    Connection,
    /// Unsupported native type at schema derivation
    Mapping,
    /// Value/type mismatch during encode or decode (never auto-retried)
    Serialization,
    /// Flush/commit failure in the batch writer
    Write,
    /// Query execution errors (bounding query, split scan)
    Query,
    /// Split planning/validation errors
    Split,
    /// Unknown/other errors
    Other,
}

impl ErrorCategory {
    /// Whether errors in this category are generally retriable.
    ///
    /// Retry itself belongs to the orchestrating framework at the
    /// task-attempt level; this crate never retries internally.
    #[inline]
    pub const fn is_retriable(self) -> bool {
        matches!(self, Self::Connection)
    }
}

/// Main error type for rdbc-bridge
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or contradictory required option
    #[error("configuration error for '{option}': {message}")]
    Configuration {
        /// The offending option or field
        option: String,
        /// What is wrong with it
        message: String,
    },

    /// Driver load/registration/connect failure
    #[error("connection error ({target}): {message}")]
    Connection {
        /// Connection target with secrets redacted
        target: String,
        /// Failure description
        message: String,
        /// Underlying driver error, when available
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Unsupported native type encountered during schema derivation
    #[error("cannot map column '{column}' of native type {type_name} (code {type_code}): {message}")]
    Mapping {
        /// Column that failed to map
        column: String,
        /// Native type name as reported by the backend
        type_name: String,
        /// Native type code as reported by the backend
        type_code: i32,
        /// Why the mapping failed
        message: String,
    },

    /// Value/type mismatch during encode or decode
    #[error("cannot convert field '{field}' from {source_type} to {target_type}: {message}")]
    Serialization {
        /// Record field involved
        field: String,
        /// Type of the value at hand
        source_type: String,
        /// Type required by the schema or destination column
        target_type: String,
        /// Conversion failure detail
        message: String,
    },

    /// Flush/commit failure in the batch writer
    #[error("write error: {message}")]
    Write {
        /// Backend's native error message, verbatim
        message: String,
        /// Underlying backend error, when available
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Query execution failed
    #[error("query error: {message}")]
    Query {
        /// Backend's native error message, verbatim
        message: String,
        /// The SQL that failed, when known
        sql: Option<String>,
        /// Underlying backend error, when available
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Split planning/validation failed
    #[error("split error on column '{column}': {message}")]
    Split {
        /// The split column
        column: String,
        /// Why planning failed
        message: String,
    },

    /// Internal error
    #[error("internal error: {message}")]
    Internal {
        /// Failure description
        message: String,
    },
}

impl Error {
    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Connection { .. } => ErrorCategory::Connection,
            Self::Mapping { .. } => ErrorCategory::Mapping,
            Self::Serialization { .. } => ErrorCategory::Serialization,
            Self::Write { .. } => ErrorCategory::Write,
            Self::Query { .. } => ErrorCategory::Query,
            Self::Split { .. } => ErrorCategory::Split,
            Self::Internal { .. } => ErrorCategory::Other,
        }
    }

    /// Whether this error is retriable (at the orchestrator's task level)
    #[inline]
    pub fn is_retriable(&self) -> bool {
        self.category().is_retriable()
    }

    /// Create a configuration error naming the offending option
    pub fn config(option: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            option: option.into(),
            message: message.into(),
        }
    }

    /// Create a connection error
    pub fn connection(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            target: target.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection error with source
    pub fn connection_with_source(
        target: impl Into<String>,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection {
            target: target.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a mapping error
    pub fn mapping(
        column: impl Into<String>,
        type_name: impl Into<String>,
        type_code: i32,
        message: impl Into<String>,
    ) -> Self {
        Self::Mapping {
            column: column.into(),
            type_name: type_name.into(),
            type_code,
            message: message.into(),
        }
    }

    /// Create a serialization error naming the field and both types
    pub fn serialization(
        field: impl Into<String>,
        source_type: impl Into<String>,
        target_type: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Serialization {
            field: field.into(),
            source_type: source_type.into(),
            target_type: target_type.into(),
            message: message.into(),
        }
    }

    /// Create a write error
    pub fn write(message: impl Into<String>) -> Self {
        Self::Write {
            message: message.into(),
            source: None,
        }
    }

    /// Create a write error with source
    pub fn write_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Write {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a query error
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
            sql: None,
            source: None,
        }
    }

    /// Create a query error with SQL
    pub fn query_with_sql(message: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
            sql: Some(sql.into()),
            source: None,
        }
    }

    /// Create a split error naming the column
    pub fn split(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Split {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration"),
            Self::Connection => write!(f, "connection"),
            Self::Mapping => write!(f, "mapping"),
            Self::Serialization => write!(f, "serialization"),
            Self::Write => write!(f, "write"),
            Self::Query => write!(f, "query"),
            Self::Split => write!(f, "split"),
            Self::Other => write!(f, "other"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_retriable() {
        assert!(ErrorCategory::Connection.is_retriable());

        assert!(!ErrorCategory::Configuration.is_retriable());
        assert!(!ErrorCategory::Mapping.is_retriable());
        assert!(!ErrorCategory::Serialization.is_retriable());
        assert!(!ErrorCategory::Write.is_retriable());
    }

    #[test]
    fn test_error_is_retriable() {
        assert!(Error::connection("db:5432", "refused").is_retriable());
        assert!(!Error::serialization("a", "STRING", "INT", "no path").is_retriable());
        assert!(!Error::write("flush failed").is_retriable());
    }

    #[test]
    fn test_configuration_error_names_option() {
        let err = Error::config("split_column", "required when num_splits > 1");
        assert!(err.to_string().contains("split_column"));
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    #[test]
    fn test_serialization_error_names_field_and_types() {
        let err = Error::serialization("amount", "BYTES", "DECIMAL(10,2)", "no conversion path");
        let msg = err.to_string();
        assert!(msg.contains("amount"));
        assert!(msg.contains("BYTES"));
        assert!(msg.contains("DECIMAL(10,2)"));
    }

    #[test]
    fn test_mapping_error_display() {
        let err = Error::mapping("payload", "STRUCT", 2002, "structural types are unsupported");
        let msg = err.to_string();
        assert!(msg.contains("payload"));
        assert!(msg.contains("STRUCT"));
        assert!(msg.contains("2002"));
    }
}
