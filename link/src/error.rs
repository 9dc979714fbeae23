//! Error types for cloudsite-link.
//!
//! Validation errors (`InvalidParam`, `AlreadyExecuted`, `DataTypeMismatch`, ...)
//! are raised at the call that caused them and leave the session usable.
//! Lifecycle errors (`SchemaParse`, `NotInitialized`, `SessionClosed`) are fatal
//! to the session instance that raised them.

use thiserror::Error;

/// Result type for cloudsite-link operations
pub type Result<T> = std::result::Result<T, LinkError>;

/// Errors surfaced by the client library
#[derive(Debug, Error)]
pub enum LinkError {
    /// The schema document is malformed or incomplete
    #[error("Schema parse error: {0}")]
    SchemaParse(String),

    /// An operation needed the schema before `init` loaded it
    #[error("Session not initialized: {0}")]
    NotInitialized(String),

    /// A parameter name or value is not valid for the statement
    #[error("Invalid parameter '{param}': {message}")]
    InvalidParam { param: String, message: String },

    /// Mutation or re-execution of a statement that already ran
    #[error("Statement already executed; call reset() before reusing it")]
    AlreadyExecuted,

    /// A result was requested from a statement that has not run
    #[error("Statement not executed: {0}")]
    NotExecuted(String),

    /// A typed row accessor does not match the column's declared type
    #[error("Column '{column}' is declared {declared} but was read as {requested}")]
    DataTypeMismatch {
        column: String,
        declared: String,
        requested: String,
    },

    /// A numeric value does not fit the requested width
    #[error("Value {value} in column '{column}' does not fit {target}")]
    NumericOverflow {
        column: String,
        value: String,
        target: &'static str,
    },

    /// The column is not present in the row
    #[error("'{0}' is not a column of this row")]
    UnknownColumn(String),

    /// Application, resource or view lookup failed
    #[error("Not found: {0}")]
    NotFound(String),

    /// Transport failure or non-success status from the remote service
    #[error("{}", format_execution(*status, message))]
    Execution {
        status: Option<u16>,
        message: String,
    },

    /// Invalid session configuration (base url, customer id, site id)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Asynchronous execution was cancelled before a result was delivered
    #[error("Execution cancelled")]
    Cancelled,

    /// The session's worker pool was shut down
    #[error("Session closed")]
    SessionClosed,
}

fn format_execution(status: Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("Execution failed ({}): {}", code, message),
        None => format!("Execution failed: {}", message),
    }
}

impl LinkError {
    pub(crate) fn invalid_param(param: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParam {
            param: param.into(),
            message: message.into(),
        }
    }

    pub(crate) fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            status: None,
            message: message.into(),
        }
    }

    /// True if the caller can fix the call and continue with the same session.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::SchemaParse(_) | Self::NotInitialized(_) | Self::SessionClosed
        )
    }

    /// HTTP status carried by an execution error, if the remote side answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Execution { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<serde_json::Error> for LinkError {
    fn from(err: serde_json::Error) -> Self {
        LinkError::execution(format!("Invalid response body: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LinkError::invalid_param("age", "not part of resource 'persons'");
        assert_eq!(
            err.to_string(),
            "Invalid parameter 'age': not part of resource 'persons'"
        );

        let err = LinkError::Execution {
            status: Some(404),
            message: "entity not found".into(),
        };
        assert_eq!(err.to_string(), "Execution failed (404): entity not found");
        assert_eq!(err.status_code(), Some(404));

        let err = LinkError::execution("connection refused");
        assert_eq!(err.to_string(), "Execution failed: connection refused");
        assert_eq!(err.status_code(), None);
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(LinkError::AlreadyExecuted.is_recoverable());
        assert!(LinkError::invalid_param("x", "y").is_recoverable());
        assert!(LinkError::execution("boom").is_recoverable());
        assert!(!LinkError::SchemaParse("missing id".into()).is_recoverable());
        assert!(!LinkError::NotInitialized("init first".into()).is_recoverable());
        assert!(!LinkError::SessionClosed.is_recoverable());
    }
}
