//! Unified error types for the configuration reader.
//!
//! Every fallible operation in the crate returns [`Result`]. Store failures surface as
//! [`Error::Database`]; the cache swallows them at the reload boundary, while write paths and
//! reconciliation propagate them to the caller.

use thiserror::Error;

/// Errors produced by the cache, the converter, the record service and the binary.
#[derive(Debug, Error)]
pub enum Error {
    /// No record with this name is present in the current snapshot.
    #[error("Configuration key '{name}' not found")]
    NotFound {
        /// The name that was looked up
        name: String,
    },

    /// A stored value could not be converted to the requested type.
    #[error("Cannot convert value '{value}' of type '{value_type}' to '{target}'")]
    Conversion {
        /// Raw stored text
        value: String,
        /// Declared type tag of the record
        value_type: String,
        /// Name of the type the caller asked for
        target: String,
    },

    /// An active record with the same name already exists for the application.
    #[error("Configuration '{name}' already exists for application '{application_name}'")]
    DuplicateName {
        /// Conflicting record name
        name: String,
        /// Application that owns the conflicting record
        application_name: String,
    },

    /// A record or argument failed validation.
    #[error("Validation error: {message}")]
    Validation {
        /// What was wrong
        message: String,
    },

    /// The application configuration could not be loaded.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the problem
        message: String,
    },

    /// The backing store rejected or failed a query.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// I/O failure while reading files or binding sockets.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The HTTP server failed.
    #[error("Server error: {message}")]
    Server {
        /// Description of the failure
        message: String,
    },
}

impl Error {
    /// Builds a conversion error for `target` from the raw value and its declared tag.
    pub(crate) fn conversion(value: &str, value_type: &str, target: &str) -> Self {
        Self::Conversion {
            value: value.to_string(),
            value_type: value_type.to_string(),
            target: target.to_string(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
