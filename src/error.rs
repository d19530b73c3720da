//! Error types for the connection factory.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Every failure is returned to the caller; nothing in this crate retries or
//! logs-and-swallows an error.

use crate::models::Backend;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Unsupported database driver: '{driver}'")]
    UnsupportedDriver { driver: String },

    #[error("Missing required parameter '{field}' for {backend}")]
    MissingParameter { field: String, backend: Backend },

    #[error("Invalid parameter '{field}' for {backend}: {reason}")]
    InvalidParameter {
        field: String,
        backend: Backend,
        reason: String,
    },

    #[error("Connection failed ({backend}): {message}")]
    Connection {
        backend: Backend,
        message: String,
        suggestion: String,
    },

    #[error("Statement failed: {message} (statement: {statement})")]
    StatementExecution { statement: String, message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl DbError {
    /// Create an unsupported driver error.
    pub fn unsupported_driver(driver: impl Into<String>) -> Self {
        Self::UnsupportedDriver {
            driver: driver.into(),
        }
    }

    /// Create a missing parameter error.
    pub fn missing_parameter(field: impl Into<String>, backend: Backend) -> Self {
        Self::MissingParameter {
            field: field.into(),
            backend,
        }
    }

    /// Create an invalid parameter error.
    pub fn invalid_parameter(
        field: impl Into<String>,
        backend: Backend,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            field: field.into(),
            backend,
            reason: reason.into(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(
        backend: Backend,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Connection {
            backend,
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a statement execution error.
    pub fn statement(statement: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StatementExecution {
            statement: statement.into(),
            message: message.into(),
        }
    }

    /// Create a configuration loading error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// The offending field for parameter errors.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::MissingParameter { field, .. } | Self::InvalidParameter { field, .. } => {
                Some(field)
            }
            _ => None,
        }
    }
}

/// Result type alias for factory operations.
pub type DbResult<T> = Result<T, DbError>;
